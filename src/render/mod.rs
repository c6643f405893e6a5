//! Presentation models for cards and widgets
//!
//! Maps normalized data to display text, arrows and color tokens. No markup is
//! produced here; the CLI prints `render_text` and the server serializes views.

mod format;

pub use format::{format_change, format_cross, format_usd_fixed, format_usd_max, format_usd_whole};

use crate::monitor::{PairSnapshot, PollState};
use crate::types::{NormalizedPoolMetrics, PoolInfo, PriceQuote, Trend};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const COLOR_UP: &str = "#22c55e";
pub const COLOR_DOWN: &str = "#ef4444";
pub const COLOR_FLAT: &str = "#9ca3af";
pub const COLOR_ALERT: &str = "red";
pub const COLOR_NORMAL: &str = "white";

/// Placeholder shown before the first value arrives
pub const EMPTY: &str = "—";

pub fn arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Flat => "→",
    }
}

pub fn trend_color(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => COLOR_UP,
        Trend::Down => COLOR_DOWN,
        Trend::Flat => COLOR_FLAT,
    }
}

/// Color for a signed 24h change; zero stays neutral
pub fn change_color(change_percent: f64) -> Option<&'static str> {
    if change_percent > 0.0 {
        Some(COLOR_UP)
    } else if change_percent < 0.0 {
        Some(COLOR_DOWN)
    } else {
        None
    }
}

/// Range the cross rate is expected to stay in
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertBand {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl AlertBand {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    pub fn is_alert(&self, value: f64) -> bool {
        self.high.is_some_and(|h| value > h) || self.low.is_some_and(|l| value < l)
    }
}

/// Widget size token from `?s=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    #[default]
    Sm,
    Md,
    Lg,
}

impl WidgetSize {
    /// Case-insensitive; anything unknown is `Sm`
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "md" => WidgetSize::Md,
            "lg" => WidgetSize::Lg,
            _ => WidgetSize::Sm,
        }
    }

    pub fn font_base(self) -> u32 {
        match self {
            WidgetSize::Sm => 16,
            WidgetSize::Md => 18,
            WidgetSize::Lg => 22,
        }
    }
}

/// Display-only query parameters of the embeddable widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WidgetParams {
    pub size: WidgetSize,
    pub scale: f64,
}

impl Default for WidgetParams {
    fn default() -> Self {
        Self {
            size: WidgetSize::Sm,
            scale: 1.0,
        }
    }
}

impl WidgetParams {
    pub fn from_query(size: Option<&str>, scale: Option<&str>) -> Self {
        let scale = scale
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite())
            .unwrap_or(1.0);

        Self {
            size: size.map(WidgetSize::parse).unwrap_or_default(),
            scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSizes {
    pub title: u32,
    pub label: u32,
    pub usd: u32,
    pub rate: u32,
}

impl FontSizes {
    pub fn for_size(size: WidgetSize) -> Self {
        let base = size.font_base();
        Self {
            title: base,
            label: base - 2,
            usd: base + 6,
            rate: base + 4,
        }
    }
}

/// Everything the embeddable widget needs to draw itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub title: String,
    pub subject_usd: f64,
    pub cross_rate: f64,
    pub usd_text: String,
    pub rate_text: String,
    pub usd_trend: Trend,
    pub rate_trend: Trend,
    pub usd_arrow: &'static str,
    pub usd_arrow_color: &'static str,
    pub rate_arrow: &'static str,
    pub rate_arrow_color: &'static str,
    pub alert: bool,
    pub rate_color: &'static str,
    pub fonts: FontSizes,
    pub scale: f64,
    pub updated_at: DateTime<Utc>,
}

impl WidgetView {
    pub fn new(
        title: &str,
        counter_symbol: &str,
        quote: &PriceQuote,
        trends: (Trend, Trend),
        band: AlertBand,
        params: WidgetParams,
    ) -> Self {
        let (usd_trend, rate_trend) = trends;
        let alert = band.is_alert(quote.cross_rate);

        Self {
            title: title.to_string(),
            subject_usd: quote.subject_usd,
            cross_rate: quote.cross_rate,
            usd_text: format_usd_fixed(quote.subject_usd, 6),
            rate_text: format_cross(quote.cross_rate, counter_symbol),
            usd_trend,
            rate_trend,
            usd_arrow: arrow(usd_trend),
            usd_arrow_color: trend_color(usd_trend),
            rate_arrow: arrow(rate_trend),
            rate_arrow_color: trend_color(rate_trend),
            alert,
            rate_color: if alert { COLOR_ALERT } else { COLOR_NORMAL },
            fonts: FontSizes::for_size(params.size),
            scale: params.scale,
            updated_at: quote.updated_at,
        }
    }
}

/// Text card for the single-pair view
pub fn pair_card(
    title: &str,
    subject_symbol: &str,
    counter_symbol: &str,
    state: &PollState<PairSnapshot>,
    band: AlertBand,
    refresh_secs: u64,
) -> String {
    let (usd_line, rate_line) = match &state.value {
        Some(snap) => {
            let alert = if band.is_alert(snap.price.cross_rate) { "  !" } else { "" };
            (
                format!("{} {}", arrow(snap.usd_trend), format_usd_fixed(snap.price.subject_usd, 6)),
                format!(
                    "{} {}{}",
                    arrow(snap.rate_trend),
                    format_cross(snap.price.cross_rate, counter_symbol),
                    alert
                ),
            )
        }
        None => (EMPTY.to_string(), EMPTY.to_string()),
    };

    let mut out = String::new();
    out.push_str(&format!("{}\n", title));
    out.push_str(&format!("  {} price (USD):        {}\n", subject_symbol, usd_line));
    out.push_str(&format!(
        "  {} price ({} per {}): {}\n",
        subject_symbol, counter_symbol, subject_symbol, rate_line
    ));
    if let Some(err) = &state.last_error {
        out.push_str(&format!("  Error: {}\n", err));
    }
    out.push_str(&format!(
        "  Updated: {} · refresh every {}s\n",
        updated_text(state.updated_at),
        refresh_secs
    ));
    out
}

/// One dashboard card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCard {
    pub pool_id: String,
    pub title: String,
    pub note: Option<String>,
    pub link: String,
    pub loading: bool,
    pub error: Option<String>,
    pub metrics: Option<NormalizedPoolMetrics>,
    pub price_text: String,
    pub change_text: String,
    pub change_color: Option<&'static str>,
    pub volume_text: String,
    pub liquidity_text: String,
}

impl PoolCard {
    pub fn new(
        pool: &PoolInfo,
        network: &str,
        metrics: Option<NormalizedPoolMetrics>,
        loading: bool,
        error: Option<String>,
    ) -> Self {
        let (price_text, change_text, change_color, volume_text, liquidity_text) = match &metrics {
            Some(m) => (
                if m.price_usd != 0.0 {
                    format_usd_max(m.price_usd, 6)
                } else {
                    EMPTY.to_string()
                },
                format_change(m.change_percent_24h),
                change_color(m.change_percent_24h),
                format_usd_whole(m.volume_24h_usd),
                format_usd_whole(m.liquidity_usd),
            ),
            None => (
                EMPTY.to_string(),
                EMPTY.to_string(),
                None,
                EMPTY.to_string(),
                EMPTY.to_string(),
            ),
        };

        Self {
            pool_id: pool.id.clone(),
            title: pool.label.clone(),
            note: pool.note.clone(),
            link: format!("https://www.geckoterminal.com/{}/pools/{}", network, pool.id),
            loading,
            error,
            metrics,
            price_text,
            change_text,
            change_color,
            volume_text,
            liquidity_text,
        }
    }

    pub fn from_state(pool: &PoolInfo, network: &str, state: &PollState<NormalizedPoolMetrics>) -> Self {
        Self::new(
            pool,
            network,
            state.value,
            state.loading,
            state.last_error.clone(),
        )
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n", self.title);
        if let Some(note) = &self.note {
            out.push_str(&format!("  {}\n", note));
        }
        out.push_str(&format!("  Pool ID: {}\n", self.pool_id));

        if self.loading && self.metrics.is_none() {
            out.push_str("  Loading…\n");
        }
        if let Some(err) = &self.error {
            out.push_str(&format!("  Error: {}\n", err));
        }
        if self.metrics.is_some() {
            out.push_str(&format!("  Price (USD):     {}\n", self.price_text));
            out.push_str(&format!("  24h Change:      {}\n", self.change_text));
            out.push_str(&format!("  24h Volume:      {}\n", self.volume_text));
            out.push_str(&format!("  Liquidity (TVL): {}\n", self.liquidity_text));
        }
        out.push_str(&format!("  {}\n", self.link));
        out
    }
}

fn updated_text(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}
