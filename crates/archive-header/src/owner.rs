//! Owner name resolution as an injected capability.
//!
//! UStar headers carry both numeric ids and owner names. Archives made on
//! another host have ids that mean nothing locally, so after decoding a
//! header the engine may reconcile the numeric ids from the names — but
//! only when it runs as the superuser, since only root can meaningfully
//! restore foreign ownership. The lookup itself is behind the
//! [`NameService`] trait so the policy is testable by substitution instead
//! of by probing the host's user database.

use log::debug;

use crate::tar::TarRecord;

/// Fallback owner name written into UStar headers when no lookup is
/// available.
pub const NOBODY_USER: &str = "nobody";

/// Fallback group name written into UStar headers when no lookup is
/// available.
pub const NOBODY_GROUP: &str = "nogroup";

/// Bidirectional uid/gid ↔ name lookups.
///
/// Every method returns `None` when the id or name is unknown; the codecs
/// then keep whatever value the header already carries.
pub trait NameService {
    /// Name of the user with the given id.
    fn user_name(&self, uid: u64) -> Option<String>;

    /// Id of the user with the given name.
    fn user_id(&self, name: &str) -> Option<u64>;

    /// Name of the group with the given id.
    fn group_name(&self, gid: u64) -> Option<String>;

    /// Id of the group with the given name.
    fn group_id(&self, name: &str) -> Option<u64>;
}

/// A fixed table of users and groups.
///
/// Useful in tests and in sandboxed environments where the host's user
/// database must not leak into archive handling.
#[derive(Debug, Default)]
pub struct StaticNames {
    users: Vec<(u64, String)>,
    groups: Vec<(u64, String)>,
}

impl StaticNames {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user mapping.
    #[must_use]
    pub fn with_user(mut self, uid: u64, name: impl Into<String>) -> Self {
        self.users.push((uid, name.into()));
        self
    }

    /// Add a group mapping.
    #[must_use]
    pub fn with_group(mut self, gid: u64, name: impl Into<String>) -> Self {
        self.groups.push((gid, name.into()));
        self
    }
}

impl NameService for StaticNames {
    fn user_name(&self, uid: u64) -> Option<String> {
        self.users
            .iter()
            .find(|(id, _)| *id == uid)
            .map(|(_, name)| name.clone())
    }

    fn user_id(&self, name: &str) -> Option<u64> {
        self.users
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    fn group_name(&self, gid: u64) -> Option<String> {
        self.groups
            .iter()
            .find(|(id, _)| *id == gid)
            .map(|(_, name)| name.clone())
    }

    fn group_id(&self, name: &str) -> Option<u64> {
        self.groups
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }
}

/// Whether the process runs with effective uid 0.
#[must_use]
pub fn running_as_superuser() -> bool {
    rustix::process::geteuid().is_root()
}

/// Replace a decoded record's numeric ids with locally resolved ones.
///
/// If the record's `userName` resolves to a local uid, that uid replaces
/// the decoded `userId`; same for the group. Names that do not resolve
/// leave the decoded ids untouched. V7 records carry no names and pass
/// through unchanged.
pub fn reconcile_owner_ids(record: &mut TarRecord, names: &dyn NameService) {
    let Some(ustar) = record.ustar.as_ref() else {
        return;
    };

    if !ustar.user_name.is_empty() {
        if let Some(uid) = names.user_id(&ustar.user_name) {
            if uid != record.uid {
                debug!(
                    "reconciled user {:?}: uid {} -> {}",
                    ustar.user_name, record.uid, uid
                );
            }
            record.uid = uid;
        }
    }
    if !ustar.group_name.is_empty() {
        if let Some(gid) = names.group_id(&ustar.group_name) {
            if gid != record.gid {
                debug!(
                    "reconciled group {:?}: gid {} -> {}",
                    ustar.group_name, record.gid, gid
                );
            }
            record.gid = gid;
        }
    }
}

/// Apply the decode-side owner policy: reconcile ids only when a lookup
/// capability is present and the process runs as the superuser.
pub fn reconcile_decoded_owners(record: &mut TarRecord, names: Option<&dyn NameService>) {
    let Some(names) = names else {
        return;
    };
    if !running_as_superuser() {
        return;
    }
    reconcile_owner_ids(record, names);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_names_lookup() {
        let names = StaticNames::new()
            .with_user(501, "alice")
            .with_group(20, "staff");

        assert_eq!(names.user_name(501).as_deref(), Some("alice"));
        assert_eq!(names.user_id("alice"), Some(501));
        assert_eq!(names.group_name(20).as_deref(), Some("staff"));
        assert_eq!(names.group_id("staff"), Some(20));

        assert_eq!(names.user_name(0), None);
        assert_eq!(names.user_id("bob"), None);
        assert_eq!(names.group_id("wheel"), None);
    }
}
