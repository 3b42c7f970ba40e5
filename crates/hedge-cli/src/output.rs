//! Table rendering for command output

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use hedge_client::api::{
    AnalystInfo, CompanyFacts, ModelInfo, ProviderInfo, ProviderStatus, StockSearchResult,
    TickerValidation,
};
use hedge_client::{RunResult, Signal, TradeAction, reasoning_text};

fn table<const N: usize>(header: [&str; N]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn action_color(action: TradeAction) -> Color {
    match action {
        TradeAction::Buy | TradeAction::Cover => Color::Green,
        TradeAction::Sell | TradeAction::Short => Color::Red,
        TradeAction::Hold => Color::Yellow,
    }
}

fn signal_color(signal: Signal) -> Color {
    match signal {
        Signal::Bullish => Color::Green,
        Signal::Bearish => Color::Red,
        Signal::Neutral => Color::Yellow,
    }
}

fn signal_cell(signal: Option<Signal>) -> Cell {
    match signal {
        Some(signal) => Cell::new(signal.to_string().to_uppercase()).fg(signal_color(signal)),
        None => Cell::new("-"),
    }
}

fn optional(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Portfolio decisions, one row per ticker
pub fn decisions_table(result: &RunResult, show_reasoning: bool) -> Table {
    let mut table = if show_reasoning {
        table(["Ticker", "Action", "Quantity", "Confidence", "Reasoning"])
    } else {
        table(["Ticker", "Action", "Quantity", "Confidence"])
    };

    for (ticker, decision) in &result.decisions {
        let mut row = vec![
            Cell::new(ticker),
            Cell::new(decision.action.to_string().to_uppercase()).fg(action_color(decision.action)),
            Cell::new(decision.quantity),
            Cell::new(format!("{:.1}%", decision.confidence)),
        ];
        if show_reasoning {
            row.push(Cell::new(reasoning_text(&decision.reasoning)));
        }
        table.add_row(row);
    }
    table
}

/// Every analyst's signal for one ticker
pub fn signals_table(result: &RunResult, ticker: &str, show_reasoning: bool) -> Table {
    let mut table = if show_reasoning {
        table(["Analyst", "Signal", "Confidence", "Reasoning"])
    } else {
        table(["Analyst", "Signal", "Confidence"])
    };

    for (analyst, signal) in result.signals_for(ticker) {
        let mut row = vec![
            Cell::new(analyst),
            signal_cell(signal.signal),
            Cell::new(format!("{:.0}%", signal.confidence)),
        ];
        if show_reasoning {
            row.push(Cell::new(reasoning_text(&signal.reasoning)));
        }
        table.add_row(row);
    }
    table
}

pub fn analysts_table(analysts: &[AnalystInfo]) -> Table {
    let mut table = table(["ID", "Name", "Description"]);
    for analyst in analysts {
        table.add_row([&analyst.id, &analyst.display_name, &analyst.description]);
    }
    table
}

pub fn providers_table(providers: &[ProviderInfo]) -> Table {
    let mut table = table(["ID", "Name", "Description"]);
    for provider in providers {
        table.add_row([&provider.id, &provider.name, &provider.description]);
    }
    table
}

pub fn models_table(models: &[ModelInfo]) -> Table {
    let mut table = table(["Model", "Name", "Provider"]);
    for model in models {
        table.add_row([&model.id, &model.name, &model.provider]);
    }
    table
}

pub fn status_table(provider: &str, status: &ProviderStatus) -> Table {
    let mut table = table(["Provider", "Running", "Models"]);
    let running = if status.running {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::Red)
    };
    table.add_row(vec![
        Cell::new(provider),
        running,
        Cell::new(status.models.join("\n")),
    ]);
    table
}

pub fn search_table(results: &[StockSearchResult]) -> Table {
    let mut table = table(["Ticker", "Name", "Exchange", "Sector"]);
    for stock in results {
        table.add_row([
            stock.ticker.as_str(),
            stock.name.as_str(),
            optional(stock.exchange.as_deref()),
            optional(stock.sector.as_deref()),
        ]);
    }
    table
}

pub fn facts_table(facts: &CompanyFacts) -> Table {
    let mut table = table(["Field", "Value"]);
    let market_cap = facts
        .market_cap
        .map_or_else(|| "-".to_string(), format_market_cap);
    let employees = facts
        .number_of_employees
        .map_or_else(|| "-".to_string(), |n| n.to_string());

    table.add_row(["Ticker", facts.ticker.as_str()]);
    table.add_row(["Name", facts.name.as_str()]);
    table.add_row(["Exchange", optional(facts.exchange.as_deref())]);
    table.add_row(["Sector", optional(facts.sector.as_deref())]);
    table.add_row(["Industry", optional(facts.industry.as_deref())]);
    table.add_row(["Market cap", market_cap.as_str()]);
    table.add_row(["Employees", employees.as_str()]);
    table.add_row(["Website", optional(facts.website_url.as_deref())]);
    table
}

pub fn validation_table(validation: &TickerValidation) -> Table {
    let mut table = table(["Ticker", "Status"]);
    for ticker in &validation.valid {
        table.add_row(vec![Cell::new(ticker), Cell::new("valid").fg(Color::Green)]);
    }
    for ticker in &validation.invalid {
        table.add_row(vec![Cell::new(ticker), Cell::new("invalid").fg(Color::Red)]);
    }
    table
}

fn format_market_cap(value: f64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e12, "T"), (1e9, "B"), (1e6, "M")];
    UNITS
        .iter()
        .find(|(scale, _)| value.abs() >= *scale)
        .map_or_else(
            || format!("${:.0}", value),
            |(scale, unit)| format!("${:.2}{}", value / scale, unit),
        )
}
