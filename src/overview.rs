// Shapes the statistics endpoints into what the overview screen draws

use crate::models::{
    Booking, BookingTotals, CleaningServiceGraph, RevenueGraph, RevenueTotals, UserTotals,
    WorkerTotals,
};
use crate::query_cache::CacheEntry;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub growth: String,
    pub is_loading: bool,
}

fn growth(change: Option<f64>) -> String {
    format!("{:.2}%", change.unwrap_or(0.0))
}

impl StatCard {
    fn from_entry<T>(
        title: &'static str,
        entry: &CacheEntry<T>,
        value: impl Fn(Option<&T>) -> String,
        change: impl Fn(&T) -> Option<f64>,
    ) -> Self {
        let data = entry.data();
        Self {
            title,
            value: value(data),
            growth: growth(data.and_then(change)),
            is_loading: entry.is_loading(),
        }
    }

    pub fn bookings(entry: &CacheEntry<BookingTotals>) -> Self {
        Self::from_entry(
            "Total Bookings",
            entry,
            |t| t.map_or(0, |t| t.total_bookings).to_string(),
            |t| t.percentage_change,
        )
    }

    pub fn revenue(entry: &CacheEntry<RevenueTotals>) -> Self {
        Self::from_entry(
            "Total Revenue",
            entry,
            |t| format!("${}", t.map_or(0.0, |t| t.total_revenue)),
            |t| t.percentage_change,
        )
    }

    pub fn users(entry: &CacheEntry<UserTotals>) -> Self {
        Self::from_entry(
            "Total Users",
            entry,
            |t| t.map_or(0, |t| t.total_users).to_string(),
            |t| t.percentage_change,
        )
    }

    pub fn workers(entry: &CacheEntry<WorkerTotals>) -> Self {
        Self::from_entry(
            "Total Workers",
            entry,
            |t| t.map_or(0, |t| t.total_workers).to_string(),
            |t| t.percentage_change,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekSeries {
    ThisWeek,
    LastWeek,
}

impl fmt::Display for WeekSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WeekSeries::ThisWeek => "This Week",
            WeekSeries::LastWeek => "Last Week",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningPoint {
    pub date: String,
    pub completed: u64,
    pub series: WeekSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenuePoint {
    pub label: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevenueSeries {
    pub monthly: Vec<RevenuePoint>,
    pub weekly: Vec<RevenuePoint>,
}

// This week's points first, then last week's
pub fn cleaning_points(graph: Option<&CleaningServiceGraph>) -> Vec<CleaningPoint> {
    let Some(graph) = graph else {
        return Vec::new();
    };

    let shape = |days: &[crate::models::DailyCompleted], series: WeekSeries| {
        days.iter()
            .map(|day| CleaningPoint {
                date: format!("{}/{}", day.period.month, day.period.day),
                completed: day.total_completed,
                series,
            })
            .collect::<Vec<_>>()
    };

    let mut points = shape(&graph.this_week, WeekSeries::ThisWeek);
    points.extend(shape(&graph.last_week, WeekSeries::LastWeek));
    points
}

pub fn revenue_series(graph: Option<&RevenueGraph>) -> RevenueSeries {
    let Some(graph) = graph else {
        return RevenueSeries::default();
    };

    RevenueSeries {
        monthly: graph
            .monthly_revenue
            .iter()
            .map(|m| RevenuePoint {
                label: format!("Month {}", m.period.month),
                revenue: m.total_revenue,
            })
            .collect(),
        weekly: graph
            .weekly_revenue
            .iter()
            .map(|w| RevenuePoint {
                label: format!("Week {}", w.period.week),
                revenue: w.total_revenue,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub cards: Vec<StatCard>,
    pub cleaning: Vec<CleaningPoint>,
    pub this_week_total: Option<u64>,
    pub revenue: RevenueSeries,
    pub recent_bookings: Vec<Booking>,
}
