// Typed cache keys, one variant per server-owned resource
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatKind {
    Bookings,
    Revenue,
    Users,
    Workers,
    CleaningServiceGraph,
    RevenueGraph,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::Bookings,
        StatKind::Revenue,
        StatKind::Users,
        StatKind::Workers,
        StatKind::CleaningServiceGraph,
        StatKind::RevenueGraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Bookings => "bookings",
            StatKind::Revenue => "revenue",
            StatKind::Users => "users",
            StatKind::Workers => "workers",
            StatKind::CleaningServiceGraph => "cleaning-service-graph",
            StatKind::RevenueGraph => "revenue-graph",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Bookings,
    Booking(String),
    RecentBookings,
    Cleaners,
    Cleaner(String),
    Admins,
    Banks,
    Bank(String),
    Faqs,
    Faq(String),
    Catalog,
    CatalogEntry(String),
    About,
    AboutEntry(String),
    Disbursements,
    Stat(StatKind),
    Profile,
}

impl QueryKey {
    // Detail keys hang off their collection; the recent-bookings feed is a view of bookings
    pub fn parent(&self) -> Option<QueryKey> {
        match self {
            QueryKey::Booking(_) | QueryKey::RecentBookings => Some(QueryKey::Bookings),
            QueryKey::Cleaner(_) => Some(QueryKey::Cleaners),
            QueryKey::Bank(_) => Some(QueryKey::Banks),
            QueryKey::Faq(_) => Some(QueryKey::Faqs),
            QueryKey::CatalogEntry(_) => Some(QueryKey::Catalog),
            QueryKey::AboutEntry(_) => Some(QueryKey::About),
            _ => None,
        }
    }

    // True when `other` is this key or sits somewhere below it
    pub fn covers(&self, other: &QueryKey) -> bool {
        if self == other {
            return true;
        }
        match other.parent() {
            Some(parent) => self.covers(&parent),
            None => false,
        }
    }

    pub fn segments(&self) -> Vec<String> {
        let (head, id) = match self {
            QueryKey::Bookings => ("bookings", None),
            QueryKey::Booking(id) => ("booking", Some(id)),
            QueryKey::RecentBookings => ("recent-bookings", None),
            QueryKey::Cleaners => ("cleaners", None),
            QueryKey::Cleaner(id) => ("cleaner", Some(id)),
            QueryKey::Admins => ("admins", None),
            QueryKey::Banks => ("banks", None),
            QueryKey::Bank(id) => ("bank", Some(id)),
            QueryKey::Faqs => ("faqs", None),
            QueryKey::Faq(id) => ("faq", Some(id)),
            QueryKey::Catalog => ("catalog", None),
            QueryKey::CatalogEntry(id) => ("catalog-entry", Some(id)),
            QueryKey::About => ("about", None),
            QueryKey::AboutEntry(id) => ("about-entry", Some(id)),
            QueryKey::Disbursements => ("disbursements", None),
            QueryKey::Stat(kind) => return vec!["stat".to_string(), kind.as_str().to_string()],
            QueryKey::Profile => ("profile", None),
        };

        let mut segments = vec![head.to_string()];
        segments.extend(id.cloned());
        segments
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("/"))
    }
}
