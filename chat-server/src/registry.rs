//! In-memory directory of clients and rooms, guarded by a single
//! reader/writer lock (owned by the caller — every method here assumes the
//! appropriate lock mode is already held, per spec §4.1).
//!
//! Slots are fixed-size arrays rather than a `HashMap`: the original
//! source's registry is two small C arrays scanned linearly, and spec §4.1
//! explicitly calls the O(MAX_CLIENTS)/O(MAX_CHANNELS) scan acceptable
//! given the small caps, so this rendition keeps that shape instead of
//! reaching for a hash map it doesn't need.

use chat_common::limits::{MAX_CHANNELS, MAX_CLIENTS};
use chat_common::wire::ClientHandle;
use chat_common::ChatError;
use std::time::Instant;

/// One occupied client slot.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub handle: ClientHandle,
    pub reply_mailbox: String,
    /// Empty when the client belongs to no channel.
    pub current_channel: String,
    pub last_active: Instant,
}

/// One occupied room slot.
#[derive(Debug, Clone)]
pub struct RoomEntry {
    pub name: String,
    /// Duplicate-free; order is insertion order (spec invariant 4).
    pub members: Vec<ClientHandle>,
}

/// Outcome of a successful `join` used by the handler to build jobs.
pub struct JoinOutcome {
    /// Set when the client was moved out of a different channel it was in.
    pub left_channel: Option<String>,
    /// Member count of the destination channel after the join.
    pub member_count: usize,
}

/// Outcome of a successful `leave`.
pub struct LeaveOutcome {
    pub channel: String,
}

/// Outcome of a full client removal (QUIT or inactivity eviction).
pub struct RemovalOutcome {
    /// The channel the client was removed from, if any.
    pub left_channel: Option<String>,
}

pub struct Registry {
    clients: [Option<ClientEntry>; MAX_CLIENTS],
    client_count: usize,
    rooms: [Option<RoomEntry>; MAX_CHANNELS],
    room_count: usize,
}

impl Registry {
    /// Builds a fresh registry seeded with the reserved default channel.
    pub fn new(default_channel: &str) -> Self {
        let mut rooms: [Option<RoomEntry>; MAX_CHANNELS] = std::array::from_fn(|_| None);
        rooms[0] = Some(RoomEntry { name: default_channel.to_string(), members: Vec::new() });
        Registry {
            clients: std::array::from_fn(|_| None),
            client_count: 0,
            rooms,
            room_count: 1,
        }
    }

    pub fn client_count(&self) -> usize {
        self.client_count
    }

    pub fn room_count(&self) -> usize {
        self.room_count
    }

    pub fn find_client(&self, handle: ClientHandle) -> Option<&ClientEntry> {
        self.clients.iter().flatten().find(|c| c.handle == handle)
    }

    fn find_client_slot(&self, handle: ClientHandle) -> Option<usize> {
        self.clients
            .iter()
            .position(|slot| matches!(slot, Some(c) if c.handle == handle))
    }

    fn find_free_client_slot(&self) -> Option<usize> {
        self.clients.iter().position(|slot| slot.is_none())
    }

    pub fn find_room(&self, name: &str) -> Option<&RoomEntry> {
        self.rooms.iter().flatten().find(|r| r.name == name)
    }

    fn find_room_slot(&self, name: &str) -> Option<usize> {
        self.rooms
            .iter()
            .position(|slot| matches!(slot, Some(r) if r.name == name))
    }

    fn find_free_room_slot(&self) -> Option<usize> {
        self.rooms.iter().position(|slot| slot.is_none())
    }

    /// Members (and their count) of `channel`, for WHO replies and broadcast fan-out.
    pub fn members_of(&self, channel: &str) -> Option<&[ClientHandle]> {
        self.find_room(channel).map(|r| r.members.as_slice())
    }

    /// Reply mailbox name for a registered client, used by DM and self-confirmations.
    pub fn mailbox_of(&self, handle: ClientHandle) -> Option<&str> {
        self.find_client(handle).map(|c| c.reply_mailbox.as_str())
    }

    /// Refreshes `last_active` for `handle`. Returns `false` if unknown
    /// (the router logs and continues regardless; refreshing is best-effort).
    pub fn touch(&mut self, handle: ClientHandle) -> bool {
        match self.find_client_slot(handle) {
            Some(idx) => {
                self.clients[idx].as_mut().unwrap().last_active = Instant::now();
                true
            }
            None => false,
        }
    }

    /// REGISTER: allocates a client slot. Exclusive lock.
    pub fn register(&mut self, handle: ClientHandle, reply_mailbox: &str) -> Result<(), ChatError> {
        let slot = self.find_free_client_slot().ok_or(ChatError::ServerFull)?;
        self.clients[slot] = Some(ClientEntry {
            handle,
            reply_mailbox: reply_mailbox.to_string(),
            current_channel: String::new(),
            last_active: Instant::now(),
        });
        self.client_count += 1;
        Ok(())
    }

    /// JOIN `channel`. Exclusive lock.
    ///
    /// Unknown senders are the handler's responsibility to drop (spec §4.4);
    /// this returns `None` so the caller can distinguish "no-op, unknown
    /// sender" from a real `Result` error path.
    pub fn join(&mut self, handle: ClientHandle, channel: &str) -> Option<Result<JoinOutcome, ChatError>> {
        let client_idx = self.find_client_slot(handle)?;
        let old_channel = self.clients[client_idx].as_ref().unwrap().current_channel.clone();

        if old_channel == channel {
            // Double JOIN to the same channel: membership stays idempotent
            // (Law L2), but the confirmation and join-broadcast still fire on
            // every successful JOIN, matching the source's `handle_join`,
            // which enqueues both unconditionally — only the leave-broadcast
            // is conditioned on the channel actually changing.
            let member_count = self.find_room(channel).map(|r| r.members.len()).unwrap_or(0);
            return Some(Ok(JoinOutcome { left_channel: None, member_count }));
        }

        let room_idx = match self.find_room_slot(channel) {
            Some(idx) => idx,
            None => match self.find_free_room_slot() {
                Some(idx) if self.room_count < MAX_CHANNELS => {
                    self.rooms[idx] = Some(RoomEntry { name: channel.to_string(), members: Vec::new() });
                    self.room_count += 1;
                    idx
                }
                _ => return Some(Err(ChatError::RoomLimitReached)),
            },
        };

        let mut left_channel = None;
        if !old_channel.is_empty() {
            if let Some(old_idx) = self.find_room_slot(&old_channel) {
                self.remove_from_room(old_idx, handle);
                left_channel = Some(old_channel);
            }
        }

        self.add_to_room(room_idx, handle);
        self.clients[client_idx].as_mut().unwrap().current_channel = channel.to_string();
        let member_count = self.rooms[room_idx].as_ref().unwrap().members.len();

        Some(Ok(JoinOutcome { left_channel, member_count }))
    }

    /// LEAVE. Exclusive lock.
    pub fn leave(&mut self, handle: ClientHandle) -> Option<Result<LeaveOutcome, ChatError>> {
        let client_idx = self.find_client_slot(handle)?;
        let channel = self.clients[client_idx].as_ref().unwrap().current_channel.clone();
        if channel.is_empty() {
            return Some(Err(ChatError::NotInChannel));
        }

        if let Some(room_idx) = self.find_room_slot(&channel) {
            self.remove_from_room(room_idx, handle);
        }
        self.clients[client_idx].as_mut().unwrap().current_channel.clear();

        Some(Ok(LeaveOutcome { channel }))
    }

    /// Full client removal (QUIT, or monitor eviction). Exclusive lock.
    ///
    /// Returns `None` if `handle` is not currently registered.
    pub fn remove_client(&mut self, handle: ClientHandle) -> Option<RemovalOutcome> {
        let client_idx = self.find_client_slot(handle)?;
        let channel = self.clients[client_idx].as_ref().unwrap().current_channel.clone();

        let mut left_channel = None;
        if !channel.is_empty() {
            if let Some(room_idx) = self.find_room_slot(&channel) {
                self.remove_from_room(room_idx, handle);
                left_channel = Some(channel);
            }
        }

        self.clients[client_idx] = None;
        self.client_count -= 1;

        Some(RemovalOutcome { left_channel })
    }

    /// All (handle, last_active age check is the caller's job) entries, for the monitor sweep.
    pub fn occupied_clients(&self) -> impl Iterator<Item = &ClientEntry> {
        self.clients.iter().flatten()
    }

    fn add_to_room(&mut self, room_idx: usize, handle: ClientHandle) {
        let room = self.rooms[room_idx].as_mut().unwrap();
        if !room.members.contains(&handle) && room.members.len() < MAX_CLIENTS {
            room.members.push(handle);
        }
    }

    /// Removes `handle` from the room; destroys the room slot if it is now
    /// empty and is not the reserved default channel (spec invariant 5).
    fn remove_from_room(&mut self, room_idx: usize, handle: ClientHandle) {
        let is_default = {
            let room = self.rooms[room_idx].as_mut().unwrap();
            room.members.retain(|m| *m != handle);
            room.members.is_empty()
        };
        if is_default {
            let default = self.is_default_room(room_idx);
            if !default {
                self.rooms[room_idx] = None;
                self.room_count -= 1;
            }
        }
    }

    fn is_default_room(&self, room_idx: usize) -> bool {
        // The reserved default channel is whichever room was seeded first;
        // callers never destroy it because `new` always populates slot 0
        // and nothing ever moves a room between slots.
        room_idx == 0
    }

    /// Debug/test helper: checks spec §3 invariants 1-6.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        use std::collections::HashSet;

        let mut seen_handles = HashSet::new();
        for client in self.occupied_clients() {
            assert!(seen_handles.insert(client.handle), "duplicate client handle {:?}", client.handle);
        }
        assert_eq!(self.client_count, self.occupied_clients().count(), "client_count out of sync");

        let mut seen_names = HashSet::new();
        let mut room_count = 0;
        for room in self.rooms.iter().flatten() {
            assert!(seen_names.insert(room.name.clone()), "duplicate room name {}", room.name);
            let mut seen_members = HashSet::new();
            for m in &room.members {
                assert!(seen_members.insert(*m), "duplicate member {:?} in room {}", m, room.name);
                assert!(self.find_client(*m).is_some(), "room {} references unknown client {:?}", room.name, m);
            }
            room_count += 1;
        }
        assert_eq!(self.room_count, room_count, "room_count out of sync");

        for client in self.occupied_clients() {
            if !client.current_channel.is_empty() {
                let room = self.find_room(&client.current_channel)
                    .unwrap_or_else(|| panic!("client {:?} points at missing room {}", client.handle, client.current_channel));
                assert!(room.members.contains(&client.handle));
            }
        }

        for room in self.rooms.iter().flatten() {
            if room_is_non_default(self, room) {
                assert!(!room.members.is_empty(), "non-default room {} is empty", room.name);
            }
        }
    }
}

#[cfg(test)]
fn room_is_non_default(registry: &Registry, room: &RoomEntry) -> bool {
    registry.find_room_slot(&room.name) != Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: u32) -> ClientHandle {
        ClientHandle(n)
    }

    #[test]
    fn register_seeds_default_channel_and_counts() {
        let reg = Registry::new("#general");
        assert_eq!(reg.room_count(), 1);
        assert_eq!(reg.client_count(), 0);
        assert!(reg.find_room("#general").is_some());
        reg.check_invariants();
    }

    #[test]
    fn register_rejects_when_full() {
        let mut reg = Registry::new("#general");
        for i in 0..MAX_CLIENTS as u32 {
            reg.register(h(i), "mbox").unwrap();
        }
        let err = reg.register(h(999), "mbox").unwrap_err();
        assert!(matches!(err, ChatError::ServerFull));
        reg.check_invariants();
    }

    #[test]
    fn join_then_leave_round_trips_membership() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        reg.join(h(1), "#room").unwrap().unwrap();
        assert_eq!(reg.find_room("#room").unwrap().members, vec![h(1)]);

        reg.leave(h(1)).unwrap().unwrap();
        assert_eq!(reg.find_client(h(1)).unwrap().current_channel, "");
        // Non-default room with zero members is reaped (invariant 5).
        assert!(reg.find_room("#room").is_none());
        reg.check_invariants();
    }

    #[test]
    fn double_join_leaves_membership_unchanged() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        reg.join(h(1), "#room").unwrap().unwrap();
        let outcome = reg.join(h(1), "#room").unwrap().unwrap();
        assert_eq!(outcome.left_channel, None);
        assert_eq!(reg.find_room("#room").unwrap().members, vec![h(1)]);
        reg.check_invariants();
    }

    #[test]
    fn join_moves_between_channels_and_reaps_old_room() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        reg.join(h(1), "#a").unwrap().unwrap();
        let outcome = reg.join(h(1), "#b").unwrap().unwrap();
        assert_eq!(outcome.left_channel.as_deref(), Some("#a"));
        assert!(reg.find_room("#a").is_none());
        assert_eq!(reg.find_room("#b").unwrap().members, vec![h(1)]);
        reg.check_invariants();
    }

    #[test]
    fn default_channel_survives_emptying() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        reg.join(h(1), "#general").unwrap().unwrap();
        reg.leave(h(1)).unwrap().unwrap();
        assert!(reg.find_room("#general").is_some());
        reg.check_invariants();
    }

    #[test]
    fn quit_is_equivalent_to_leave_then_slot_zeroing() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        reg.join(h(1), "#room").unwrap().unwrap();

        let removal = reg.remove_client(h(1)).unwrap();
        assert_eq!(removal.left_channel.as_deref(), Some("#room"));
        assert!(reg.find_client(h(1)).is_none());
        assert!(reg.find_room("#room").is_none());
        assert_eq!(reg.client_count(), 0);
        reg.check_invariants();
    }

    #[test]
    fn room_exhaustion_rejects_join() {
        let mut reg = Registry::new("#general");
        reg.register(h(1), "mbox1").unwrap();
        // #general already occupies one of MAX_CHANNELS slots.
        for i in 0..(MAX_CHANNELS - 1) {
            reg.join(h(1), &format!("#room{i}")).unwrap().unwrap();
        }
        let err = reg.join(h(1), "#overflow").unwrap().unwrap_err();
        assert!(matches!(err, ChatError::RoomLimitReached));
        reg.check_invariants();
    }
}
