use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};

use crate::{
    dto::stats::{BasicStats, DashboardStats, InventoryTrend, RevenueTrend, Trends},
    error::{AppError, AppResult},
    middleware::auth::{Session, ensure_admin},
    models::{LOW_STOCK_THRESHOLD, round2},
    response::ApiResponse,
    state::AppState,
};

const MONTH_LABELS: [&str; 12] = [
    "Sty", "Lut", "Mar", "Kwi", "Maj", "Cze", "Lip", "Sie", "Wrz", "Paź", "Lis", "Gru",
];

/// Months shown by the trend charts, current month included.
pub const TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthBucket {
    pub year: i32,
    pub month: i32,
    pub total_value: f64,
    pub total_quantity: i64,
}

/// Midnight UTC on the first day of the month `back` months before `now`.
pub fn month_start(now: DateTime<Utc>, back: u32) -> AppResult<DateTime<Utc>> {
    now.date_naive()
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(back)))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("month arithmetic out of range")))
}

pub fn month_label(year: i32, month: i32) -> String {
    let name = usize::try_from(month - 1)
        .ok()
        .and_then(|idx| MONTH_LABELS.get(idx))
        .copied()
        .unwrap_or("?");
    format!("{name} {year}")
}

/// Percentage change against the previous month; 0 when there is no baseline.
pub fn revenue_growth(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        round2((current - previous) / previous * 100.0)
    } else {
        0.0
    }
}

pub fn build_trends(buckets: &[MonthBucket]) -> Trends {
    let labels: Vec<String> = buckets
        .iter()
        .map(|b| month_label(b.year, b.month))
        .collect();
    Trends {
        revenue: RevenueTrend {
            labels: labels.clone(),
            values: buckets.iter().map(|b| round2(b.total_value)).collect(),
        },
        inventory: InventoryTrend {
            labels,
            values: buckets.iter().map(|b| b.total_quantity).collect(),
        },
    }
}

pub async fn dashboard_stats(
    state: &AppState,
    session: &Session,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(session)?;
    let now = Utc::now();
    let current_month = month_start(now, 0)?;
    let previous_month = month_start(now, 1)?;
    let trend_start = month_start(now, TREND_MONTHS - 1)?;

    let totals = sqlx::query_as::<_, (i64, f64, f64, i64)>(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(price * quantity), 0)::float8,
               COALESCE(AVG(price), 0)::float8,
               COUNT(*) FILTER (WHERE quantity < $1)
        FROM products
        "#,
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_one(&state.pool);

    let revenue = sqlx::query_as::<_, (f64, f64)>(
        r#"
        SELECT COALESCE(SUM(price * quantity) FILTER (WHERE last_edited_at >= $1), 0)::float8,
               COALESCE(SUM(price * quantity) FILTER (
                   WHERE last_edited_at >= $2 AND last_edited_at < $1
               ), 0)::float8
        FROM products
        "#,
    )
    .bind(current_month)
    .bind(previous_month)
    .fetch_one(&state.pool);

    let buckets = sqlx::query_as::<_, MonthBucket>(
        r#"
        SELECT EXTRACT(YEAR FROM last_edited_at AT TIME ZONE 'UTC')::int4 AS year,
               EXTRACT(MONTH FROM last_edited_at AT TIME ZONE 'UTC')::int4 AS month,
               COALESCE(SUM(price * quantity), 0)::float8 AS total_value,
               COALESCE(SUM(quantity), 0)::int8 AS total_quantity
        FROM products
        WHERE last_edited_at >= $1
        GROUP BY 1, 2
        ORDER BY 1, 2
        "#,
    )
    .bind(trend_start)
    .fetch_all(&state.pool);

    let ((total_products, total_value, average_price, low_stock_items), (monthly, last_month), buckets) =
        tokio::try_join!(totals, revenue, buckets)?;

    Ok(ApiResponse::success(DashboardStats {
        basic_stats: BasicStats {
            total_products,
            total_value: round2(total_value),
            average_price: round2(average_price),
            low_stock_items,
            monthly_revenue: round2(monthly),
            revenue_growth: revenue_growth(monthly, last_month),
        },
        trends: build_trends(&buckets),
        last_updated: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_start_walks_back_across_years() {
        let now = Utc.with_ymd_and_hms(2024, 2, 17, 13, 45, 0).unwrap();
        assert_eq!(
            month_start(now, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            month_start(now, 5).unwrap(),
            Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn labels_use_polish_abbreviations() {
        assert_eq!(month_label(2024, 1), "Sty 2024");
        assert_eq!(month_label(2023, 10), "Paź 2023");
        assert_eq!(month_label(2023, 13), "? 2023");
    }

    #[test]
    fn growth_is_zero_without_a_baseline() {
        assert_eq!(revenue_growth(100.0, 0.0), 0.0);
        assert_eq!(revenue_growth(150.0, 100.0), 50.0);
        assert_eq!(revenue_growth(1.0, 3.0), -66.67);
    }

    #[test]
    fn trends_share_labels_between_series() {
        let buckets = vec![
            MonthBucket {
                year: 2024,
                month: 1,
                total_value: 10.005,
                total_quantity: 4,
            },
            MonthBucket {
                year: 2024,
                month: 2,
                total_value: 20.0,
                total_quantity: 7,
            },
        ];
        let trends = build_trends(&buckets);
        assert_eq!(trends.revenue.labels, vec!["Sty 2024", "Lut 2024"]);
        assert_eq!(trends.revenue.labels, trends.inventory.labels);
        assert_eq!(trends.inventory.values, vec![4, 7]);
        assert_eq!(trends.revenue.values[1], 20.0);
    }
}
