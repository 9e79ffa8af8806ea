#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct GroupId(pub i64);

impl GroupId {
    /// Owner id of the group's wall, as the remote API expects it.
    pub fn as_owner(&self) -> i64 {
        -self.0
    }
}

/// Resolved once per session and immutable afterwards.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}
