//! Message relay: route a frame to the opposite role.
//!
//! Delivery is best-effort and at-most-once. A frame whose partner is
//! absent or not live is dropped without telling the sender.

use crate::connection::ConnectionId;
use crate::pairing::Liveness;
use crate::registry::SessionRegistry;
use scan_types::{Role, SessionToken};

/// Where a frame from `(token, from)` should go, if anywhere.
pub fn route(
    registry: &SessionRegistry,
    token: &SessionToken,
    from: Role,
    liveness: &impl Liveness,
) -> Option<ConnectionId> {
    registry
        .get(token)?
        .slot(from.opposite())
        .filter(|partner| liveness.is_live(*partner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Retain, SessionRecord};
    use std::collections::HashSet;
    use std::time::Instant;

    struct Open(HashSet<ConnectionId>);

    impl Liveness for Open {
        fn is_live(&self, id: ConnectionId) -> bool {
            self.0.contains(&id)
        }
    }

    fn paired(registry: &SessionRegistry, token: &SessionToken) -> (ConnectionId, ConnectionId) {
        let d = ConnectionId::next();
        let m = ConnectionId::next();
        registry.update(
            token,
            || Some(SessionRecord::new(Instant::now())),
            |record| {
                record.desktop = Some(d);
                record.mobile = Some(m);
                (Retain::Keep, ())
            },
        );
        (d, m)
    }

    #[test]
    fn routes_to_opposite_role() {
        let registry = SessionRegistry::new();
        let token = SessionToken::new("s").unwrap();
        let (d, m) = paired(&registry, &token);
        let open = Open([d, m].into_iter().collect());

        assert_eq!(route(&registry, &token, Role::Desktop, &open), Some(m));
        assert_eq!(route(&registry, &token, Role::Mobile, &open), Some(d));
    }

    #[test]
    fn dead_partner_drops() {
        let registry = SessionRegistry::new();
        let token = SessionToken::new("s").unwrap();
        let (d, _m) = paired(&registry, &token);
        let open = Open([d].into_iter().collect());

        assert_eq!(route(&registry, &token, Role::Desktop, &open), None);
    }

    #[test]
    fn unknown_session_drops() {
        let registry = SessionRegistry::new();
        let token = SessionToken::new("nope").unwrap();
        let open = Open(HashSet::new());
        assert_eq!(route(&registry, &token, Role::Mobile, &open), None);
    }
}
