//! Terminal output formatting

use chrono::{DateTime, Utc};
use colored::Colorize;
use subwatch_core::{ActiveEntitlements, Catalog, Product, RefreshOutcome, Subscription};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// One line per subscription: group, product, tier level, and how long it lasts.
pub fn format_subscription(sub: &Subscription) -> String {
    let lasts = if sub.is_free() {
        "free".dimmed().to_string()
    } else {
        match sub.expires_at() {
            Some(end) => format!("until {}", end.format(TIME_FORMAT)),
            None => "no expiry".to_string(),
        }
    };
    format!(
        "    {:<16} {} (level {}) {}",
        sub.group,
        sub.product.label().bold(),
        sub.product.level,
        lasts
    )
}

pub fn format_product(product: &Product) -> String {
    let mut line = format!("    {:<4} {}", product.level, product.id);
    if let Some(name) = &product.name {
        line.push_str(&format!(" ({})", name));
    }
    if product.always_active {
        line.push_str(&format!(" {}", "free".dimmed()));
    }
    line
}

/// Headline for a cycle: check mark plus subscription count, or the error.
pub fn format_headline(outcome: &RefreshOutcome) -> String {
    match &outcome.error {
        None => {
            let count = outcome.active.as_ref().map_or(0, ActiveEntitlements::len);
            format!(
                "  {} cycle {} — {} active subscription(s)",
                "✅".green(),
                outcome.cycle,
                count
            )
        }
        Some(e) => format!("  {} cycle {} — {}", "❌".red(), outcome.cycle, e),
    }
}

pub fn print_outcome(outcome: &RefreshOutcome) {
    println!("{}", format_headline(outcome));
    if let Some(active) = &outcome.active {
        print_entitlements(active);
    }
}

pub fn print_snapshot(at: DateTime<Utc>, snapshot: Option<&ActiveEntitlements>) {
    println!("  Entitlements at {}", at.format(TIME_FORMAT).to_string().bold());
    match snapshot {
        Some(active) => print_entitlements(active),
        None => println!(
            "    {}",
            "receipt references products missing from the catalog".yellow()
        ),
    }
}

pub fn print_entitlements(active: &ActiveEntitlements) {
    if active.is_empty() {
        println!("    {}", "no active subscriptions".dimmed());
        return;
    }
    for (_, sub) in active.iter() {
        println!("{}", format_subscription(sub));
    }
}

pub fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("  {}", "No product groups configured.".dimmed());
        return;
    }
    for group in catalog.groups() {
        println!("  {}", group.id.bold());
        let mut products: Vec<&Product> = group.products.iter().collect();
        products.sort_by_key(|p| p.level);
        for product in products {
            println!("{}", format_product(product));
        }
    }
}
