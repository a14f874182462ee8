/// Page arithmetic over a counted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub total: i64,
    pub per_page: i64,
}

impl Paginator {
    pub fn new(total: i64, per_page: i64) -> Self {
        Self {
            total: total.max(0),
            per_page: per_page.max(1),
        }
    }

    /// Always at least one, so an empty collection has an empty first page.
    pub fn num_pages(&self) -> i64 {
        ((self.total + self.per_page - 1) / self.per_page).max(1)
    }

    /// Missing or non-numeric -> first page; out of range -> last page.
    pub fn resolve(&self, raw: Option<&str>) -> i64 {
        match raw.map(str::trim).and_then(|r| r.parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 || n > self.num_pages() => self.num_pages(),
            Some(n) => n,
        }
    }

    pub fn offset(&self, page: i64) -> i64 {
        (page - 1) * self.per_page
    }
}
