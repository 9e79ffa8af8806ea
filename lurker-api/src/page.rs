/// The `{count, items}` envelope every paginated remote method answers with.
///
/// `count` is the total number of matching items on the server side, not the
/// length of `items`; single-item probes rely on it to size the fan-out.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn total(&self) -> u64 {
        self.count.unwrap_or(self.items.len() as u64)
    }
}
