//! Single-slot send permission.
//!
//! The wire protocol allows at most one frame (or stereo pair) in flight:
//! a send is only permitted right after the socket opens, or after the peer's
//! next message (its arrival counts as the acknowledgment). The gate holds
//! that permission as an explicit value owned by the streamer instead of an
//! ambient mutable flag.

/// Permission slot for the next send cycle. Starts closed; the streamer opens
/// it on socket-open and on every inbound peer message.
#[derive(Debug, Default)]
pub struct SendGate {
    ready: bool,
}

impl SendGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant permission for one send cycle. Grants do not stack: two
    /// acknowledgments still permit only a single send.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Take the permission if present. A caller that fails mid-send hands it
    /// back with `mark_ready` so a later tick can retry; permission is only
    /// truly spent by a fully successful send.
    pub fn try_consume_ready(&mut self) -> bool {
        if self.ready {
            self.ready = false;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_closed() {
        let mut gate = SendGate::new();
        assert!(!gate.is_ready());
        assert!(!gate.try_consume_ready());
    }

    #[test]
    fn consume_spends_the_grant() {
        let mut gate = SendGate::new();
        gate.mark_ready();
        assert!(gate.is_ready());
        assert!(gate.try_consume_ready());
        assert!(!gate.is_ready());
        assert!(!gate.try_consume_ready());
    }

    #[test]
    fn grants_do_not_stack() {
        let mut gate = SendGate::new();
        gate.mark_ready();
        gate.mark_ready();
        assert!(gate.try_consume_ready());
        assert!(!gate.try_consume_ready());
    }

    #[test]
    fn failed_send_can_hand_the_grant_back() {
        let mut gate = SendGate::new();
        gate.mark_ready();
        assert!(gate.try_consume_ready());
        gate.mark_ready();
        assert!(gate.try_consume_ready());
    }

    proptest! {
        // For any interleaving of acknowledgments and send attempts, the
        // number of sends never exceeds the number of grants, and two sends
        // never happen without a grant in between.
        #[test]
        fn at_most_one_send_per_grant(events in proptest::collection::vec(0u8..2, 0..256)) {
            let mut gate = SendGate::new();
            let mut grants: u32 = 0;
            let mut sends: u32 = 0;
            let mut sent_since_grant = false;
            for event in events {
                if event == 0 {
                    gate.mark_ready();
                    grants += 1;
                    sent_since_grant = false;
                } else if gate.try_consume_ready() {
                    prop_assert!(!sent_since_grant);
                    sends += 1;
                    sent_since_grant = true;
                }
                prop_assert!(sends <= grants);
            }
        }
    }
}
