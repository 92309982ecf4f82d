use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub total_products: i64,
    pub total_value: f64,
    pub average_price: f64,
    pub low_stock_items: i64,
    pub monthly_revenue: f64,
    pub revenue_growth: f64,
}

/// Monthly sums of `price * quantity`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RevenueTrend {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Monthly sums of units on hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct InventoryTrend {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Trends {
    pub revenue: RevenueTrend,
    pub inventory: InventoryTrend,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub basic_stats: BasicStats,
    pub trends: Trends,
    pub last_updated: DateTime<Utc>,
}
