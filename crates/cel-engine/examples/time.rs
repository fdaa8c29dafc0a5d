//! Working with timestamps and durations in CEL.
//!
//! Run with: cargo run -p cel-engine --example time

use cel_engine::{Context, Duration, Timestamp};

fn run(source: &str, context: &Context) {
    match cel_engine::evaluate(source, context) {
        Ok(value) => println!("   {} = {}", source, value),
        Err(err) => println!("   {} failed: {}", source, err),
    }
}

fn main() {
    println!("=== CEL Timestamp and Duration Examples ===\n");

    let empty = Context::new();

    println!("1. Parsing timestamps and durations from strings:");
    for source in [
        "timestamp('2024-03-15T10:30:00Z')",
        "timestamp('2024-03-15T10:30:00+02:00')",
        "duration('1h30m')",
        "duration('500ms')",
        "duration('-1.5h')",
    ] {
        run(source, &empty);
    }

    println!("\n2. Timestamp arithmetic:");
    let mut context = Context::new();
    context.insert("event_time", Timestamp::new(1_710_498_600, 0)); // 2024-03-15T10:30:00Z
    context.insert("timeout", Duration::new(3600, 0));
    for source in [
        "event_time + timeout",
        "event_time - duration('30m')",
        "timestamp('2024-03-16T00:00:00Z') - event_time",
        "event_time + timeout > timestamp('2024-03-15T11:00:00Z')",
    ] {
        run(source, &context);
    }

    println!("\n3. Field accessors (UTC unless a time zone is given):");
    for source in [
        "event_time.getFullYear()",
        "event_time.getMonth()",
        "event_time.getDate()",
        "event_time.getDayOfWeek()",
        "event_time.getHours()",
        "event_time.getHours('America/New_York')",
        "event_time.getHours('+05:30')",
        "timeout.getMinutes()",
    ] {
        run(source, &context);
    }

    println!("\n4. Conversions:");
    for source in [
        "string(event_time)",
        "int(event_time)",
        "timestamp(0)",
        "string(duration('90s'))",
    ] {
        run(source, &context);
    }
}
