//! Builds the iteration domain of a two-statement loop nest, schedules it and
//! prints the result in several notations.
//!
//! Run with: cargo run --example loop_nest

use isle::prelude::*;

fn main() -> Result<()> {
    let ctx = Context::new();

    let init = UnionSet::parse(&ctx, "{ S[i] : 0 <= i <= 9 }")?;
    let body = UnionSet::parse(&ctx, "{ T[i, j] : 0 <= i <= 9 and 0 <= j <= 4 }")?;

    let mut schedule = Schedule::sequence(&Schedule::from_domain(&init)?, &Schedule::from_domain(&body)?)?;
    println!("schedule: {}", schedule);

    // Only the first half of the iterations survives.
    let half = UnionSet::parse(&ctx, "{ S[i] : i <= 4; T[i, j] : i <= 4 }")?;
    schedule.intersect_domain(&half)?;
    println!("restricted: {}", schedule.map()?);

    let t = body.extract(&Space::set(&ctx, &[], &Tuple::new("T", &["i", "j"]))?)?;
    let mut printer = Printer::to_stdout(&ctx)?;
    for format in [OutputFormat::Isl, OutputFormat::C, OutputFormat::Omega, OutputFormat::Latex] {
        printer.set_format(format).print_str(&format!("{:?}: ", format))?.print(&t)?.print_str("\n")?;
    }
    printer.flush()?;

    let ls = LocalSpace::from_space(&t.space()?)?;
    let i = Expression::variable(&ls, DimType::Set, 0)?;
    let j = Expression::variable(&ls, DimType::Set, 1)?;
    let work = i.scale(&Value::from_i64(&ctx, 5)?)?.add(&j)?;
    println!("last flattened index: {}", t.maximum(&work)?);
    println!("first instance: {}", t.lex_minimum()?);

    Ok(())
}
