//! Text rendering for every printable engine object.

use super::aff::AffData;
use super::boxes::{Cell, Interval, Poly, UnionPoly};
use super::constraint::ConstraintData;
use super::mat::MatData;
use super::point::PointData;
use super::schedule::ScheduleData;
use super::space::{SpaceData, Tuple};
use super::val::ValData;
use super::Format;

type Rendered = Result<String, String>;

fn unsupported(what: &str, format: Format) -> Rendered {
    Err(format!("cannot print {} in {:?} format", what, format))
}

fn names(space: &SpaceData) -> Vec<String> {
    (0..space.total()).map(|c| space.column_name(c)).collect()
}

fn params_prefix(space: &SpaceData, arrow: &str) -> String {
    if space.n_param() == 0 {
        return String::new();
    }
    let names: Vec<String> = (0..space.n_param()).map(|c| space.column_name(c)).collect();
    format!("[{}] {} ", names.join(", "), arrow)
}

fn tuple_text(tuple: &Tuple, names: &[String]) -> String {
    format!("{}[{}]", tuple.name.as_deref().unwrap_or(""), names.join(", "))
}

/// `A[a, b]` or `A[i] -> B[o]` for a space, without parameters.
fn tuples(space: &SpaceData, arrow: &str) -> String {
    let all = names(space);
    let np = space.n_param();
    let ni = space.n_in();
    let out = space
        .output
        .as_ref()
        .map(|t| tuple_text(t, &all[np + ni..]))
        .unwrap_or_default();
    match &space.input {
        Some(input) => format!("{} {} {}", tuple_text(input, &all[np..np + ni]), arrow, out),
        None => out,
    }
}

struct Ops {
    le: &'static str,
    ge: &'static str,
    eq: &'static str,
    and: &'static str,
}

const ISL: Ops = Ops {
    le: "<=",
    ge: ">=",
    eq: "=",
    and: " and ",
};
const C: Ops = Ops {
    le: "<=",
    ge: ">=",
    eq: "==",
    and: " && ",
};
const LATEX: Ops = Ops {
    le: "\\le",
    ge: "\\ge",
    eq: "=",
    and: " \\wedge ",
};

fn bound_text(name: &str, interval: Interval, ops: &Ops, chained: bool) -> Option<String> {
    match (interval.lo, interval.hi) {
        (None, None) => None,
        (Some(l), Some(h)) if l == h => Some(format!("{} {} {}", name, ops.eq, l)),
        (Some(l), Some(h)) if chained => Some(format!("{} {} {} {} {}", l, ops.le, name, ops.le, h)),
        (Some(l), Some(h)) => Some(format!("{} {} {}{}{} {} {}", name, ops.ge, l, ops.and, name, ops.le, h)),
        (Some(l), None) => Some(format!("{} {} {}", name, ops.ge, l)),
        (None, Some(h)) => Some(format!("{} {} {}", name, ops.le, h)),
    }
}

fn cell_text(cell: &Cell, names: &[String], ops: &Ops, chained: bool) -> Vec<String> {
    cell.iter()
        .zip(names)
        .filter_map(|(i, n)| bound_text(n, *i, ops, chained))
        .collect()
}

/// Condition part of a poly: `None` for the universe.
fn condition(poly: &Poly, ops: &Ops, or: &str, chained: bool, paren: bool) -> Option<String> {
    let names = names(&poly.space);
    let cells: Vec<Vec<String>> = poly.cells.iter().map(|c| cell_text(c, &names, ops, chained)).collect();
    if cells.iter().any(Vec::is_empty) {
        return None;
    }
    let several = cells.len() > 1;
    let parts: Vec<String> = cells
        .into_iter()
        .map(|c| {
            let joined = c.join(ops.and);
            if paren && several && c.len() > 1 {
                format!("({})", joined)
            } else {
                joined
            }
        })
        .collect();
    Some(parts.join(or))
}

fn isl_piece(poly: &Poly) -> String {
    let head = tuples(&poly.space, "->");
    if poly.cells.is_empty() {
        return format!("{} : false", head);
    }
    match condition(poly, &ISL, " or ", true, false) {
        Some(cond) => format!("{} : {}", head, cond),
        None => head,
    }
}

fn omega_piece(poly: &Poly) -> String {
    let all = names(&poly.space);
    let np = poly.space.n_param();
    let ni = poly.space.n_in();
    let head = match &poly.space.input {
        Some(_) => format!("[{}] -> [{}]", all[np..np + ni].join(","), all[np + ni..].join(",")),
        None => format!("[{}]", all[np..].join(",")),
    };
    if poly.cells.is_empty() {
        return format!("{{{} : FALSE}}", head);
    }
    poly.cells
        .iter()
        .map(|cell| {
            let cons = cell_text(cell, &all, &ISL, true);
            if cons.is_empty() {
                format!("{{{}}}", head)
            } else {
                format!("{{{} : {}}}", head, cons.join(" && "))
            }
        })
        .collect::<Vec<_>>()
        .join(" union ")
}

fn latex_piece(poly: &Poly) -> String {
    let head = tuples(&poly.space, "\\to");
    if poly.cells.is_empty() {
        return format!("{} : \\mathit{{false}}", head);
    }
    match condition(poly, &LATEX, " \\vee ", true, false) {
        Some(cond) => format!("{} : {}", head, cond),
        None => head,
    }
}

/// One matrix per cell: `[eq?0:1, coeffs.., constant]` rows.
fn polylib_cell(poly: &Poly, cell: &Cell, extended: bool) -> String {
    let total = poly.space.total();
    let mut rows: Vec<Vec<i128>> = Vec::new();
    for (col, interval) in cell.iter().enumerate() {
        let row = |flag: i128, coeff: i128, constant: i128| {
            let mut row = vec![0; total + 2];
            row[0] = flag;
            row[col + 1] = coeff;
            row[total + 1] = constant;
            row
        };
        match (interval.lo, interval.hi) {
            (Some(l), Some(h)) if l == h => rows.push(row(0, 1, -i128::from(l))),
            (lo, hi) => {
                if let Some(l) = lo {
                    rows.push(row(1, 1, -i128::from(l)));
                }
                if let Some(h) = hi {
                    rows.push(row(1, -1, i128::from(h)));
                }
            }
        }
    }
    let mut out = if extended {
        format!(
            "{} {} {} {} 0 {}\n",
            rows.len(),
            total + 2,
            poly.space.n_out(),
            poly.space.n_in(),
            poly.space.n_param()
        )
    } else {
        format!("{} {}\n", rows.len(), total + 2)
    };
    for row in rows {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>3}", v)).collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

fn polylib(poly: &Poly, extended: bool) -> String {
    let mut out = format!("{}\n", poly.cells.len());
    for cell in &poly.cells {
        out.push('\n');
        out.push_str(&polylib_cell(poly, cell, extended));
    }
    out
}

pub(crate) fn poly(poly: &Poly, format: Format) -> Rendered {
    let poly = poly.clone().coalesced();
    Ok(match format {
        Format::Isl => format!("{}{{ {} }}", params_prefix(&poly.space, "->"), isl_piece(&poly)),
        Format::C => {
            if poly.cells.is_empty() {
                "0".to_string()
            } else {
                condition(&poly, &C, " || ", false, true).unwrap_or_else(|| "1".to_string())
            }
        }
        Format::Omega => omega_piece(&poly),
        Format::PolyLib => polylib(&poly, false),
        Format::ExtPolyLib => polylib(&poly, true),
        Format::Latex => format!("{}\\{{ {} \\}}", params_prefix(&poly.space, "\\to"), latex_piece(&poly)),
    })
}

pub(crate) fn union(union: &UnionPoly, format: Format) -> Rendered {
    let parts: Vec<Poly> = union
        .parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.clone().coalesced())
        .collect();
    let prefix = |arrow| parts.first().map(|p| params_prefix(&p.space, arrow)).unwrap_or_default();
    match format {
        Format::Isl => {
            let pieces: Vec<String> = parts.iter().map(isl_piece).collect();
            if pieces.is_empty() {
                return Ok("{  }".to_string());
            }
            Ok(format!("{}{{ {} }}", prefix("->"), pieces.join("; ")))
        }
        Format::Omega => Ok(parts.iter().map(omega_piece).collect::<Vec<_>>().join(" union ")),
        Format::Latex => {
            let pieces: Vec<String> = parts.iter().map(latex_piece).collect();
            Ok(format!("{}\\{{ {} \\}}", prefix("\\to"), pieces.join("; ")))
        }
        other => unsupported("a union", other),
    }
}

fn linear(coeffs: &[i64], constant: i64, names: &[String], c_style: bool) -> String {
    let mut out = String::new();
    for (coeff, name) in coeffs.iter().zip(names) {
        if *coeff == 0 {
            continue;
        }
        let magnitude = coeff.unsigned_abs();
        let term = match (magnitude, c_style) {
            (1, _) => name.clone(),
            (m, true) => format!("{} * {}", m, name),
            (m, false) => format!("{}{}", m, name),
        };
        if out.is_empty() {
            if *coeff < 0 {
                out.push('-');
            }
        } else {
            out.push_str(if *coeff < 0 { " - " } else { " + " });
        }
        out.push_str(&term);
    }
    if out.is_empty() {
        return constant.to_string();
    }
    if constant != 0 {
        out.push_str(if constant < 0 { " - " } else { " + " });
        out.push_str(&constant.unsigned_abs().to_string());
    }
    out
}

fn aff_body(aff: &AffData, c_style: bool) -> String {
    let body = linear(&aff.coeffs, aff.constant, &names(&aff.space), c_style);
    match (aff.denom, c_style) {
        (1, true) => body,
        (1, false) => format!("({})", body),
        (d, true) => format!("({})/{}", body, d),
        (d, false) => format!("(({})/{})", body, d),
    }
}

pub(crate) fn aff(aff: &AffData, format: Format) -> Rendered {
    match format {
        Format::Isl => Ok(format!(
            "{}{{ {} -> [{}] }}",
            params_prefix(&aff.space, "->"),
            tuples(&aff.space, "->"),
            aff_body(aff, false)
        )),
        Format::C => Ok(aff_body(aff, true)),
        other => unsupported("an affine expression", other),
    }
}

pub(crate) fn constraint(c: &ConstraintData, format: Format) -> Rendered {
    if format != Format::Isl {
        return unsupported("a constraint", format);
    }
    let space = &c.aff.space;
    let lhs = linear(&c.aff.coeffs, c.aff.constant, &names(space), false);
    Ok(format!(
        "{}{{ {} : {} {} 0 }}",
        params_prefix(space, "->"),
        tuples(space, "->"),
        lhs,
        if c.equality { "=" } else { ">=" }
    ))
}

pub(crate) fn val(v: &ValData, format: Format) -> Rendered {
    match format {
        Format::Isl | Format::C => Ok(if v.den == 1 {
            v.num.to_string()
        } else {
            format!("{}/{}", v.num, v.den)
        }),
        other => unsupported("a value", other),
    }
}

pub(crate) fn point(p: &PointData, format: Format) -> Rendered {
    if format != Format::Isl {
        return unsupported("a point", format);
    }
    let np = p.space.n_param();
    let prefix = if np == 0 {
        String::new()
    } else {
        let params: Vec<String> = (0..np)
            .map(|c| format!("{} = {}", p.space.column_name(c), p.coords[c]))
            .collect();
        format!("[{}] -> ", params.join(", "))
    };
    let coords: Vec<String> = p.coords[np..].iter().map(i64::to_string).collect();
    let name = p.space.output.as_ref().and_then(|t| t.name.as_deref()).unwrap_or("");
    Ok(format!("{}{{ {}[{}] }}", prefix, name, coords.join(", ")))
}

pub(crate) fn space(space: &SpaceData, format: Format) -> Rendered {
    if format != Format::Isl {
        return unsupported("a space", format);
    }
    if space.output.is_none() {
        return Ok(format!("{}{{ : }}", params_prefix(space, "->")));
    }
    Ok(format!("{}{{ {} }}", params_prefix(space, "->"), tuples(space, "->")))
}

pub(crate) fn mat(m: &MatData, format: Format) -> Rendered {
    if format != Format::Isl {
        return unsupported("a matrix", format);
    }
    let rows: Vec<String> = (0..m.rows)
        .map(|r| {
            let row: Vec<String> = m.row(r).iter().map(i64::to_string).collect();
            format!("[{}]", row.join(","))
        })
        .collect();
    Ok(format!("[{}]", rows.join(",")))
}

pub(crate) fn schedule(s: &ScheduleData, format: Format) -> Rendered {
    if format != Format::Isl {
        return unsupported("a schedule", format);
    }
    Ok(format!(
        "{{ domain: \"{}\", schedule: \"{}\" }}",
        union(&s.domain()?, Format::Isl)?,
        union(&s.map()?, Format::Isl)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse::parse_single;

    fn isl(text: &str) -> String {
        poly(&parse_single(text, false).unwrap(), Format::Isl).unwrap()
    }

    #[test]
    fn isl_notation() {
        assert_eq!(isl("{ A[a, b] }"), "{ A[a, b] }");
        assert_eq!(
            isl("[N] -> { A[a] : 0 <= a and a <= 9 and N >= 2 }"),
            "[N] -> { A[a] : N >= 2 and 0 <= a <= 9 }"
        );
        assert_eq!(isl("{ A[a] : a > 3 and a < 2 }"), "{ A[a] : false }");
        assert_eq!(isl("{ [a] : a = 1 or a = 5 }"), "{ [a] : a = 1 or a = 5 }");
    }

    #[test]
    fn c_notation() {
        let p = parse_single("{ A[a, b] : 0 <= a <= 9 and b >= 2 or a = 20 }", false).unwrap();
        assert_eq!(
            poly(&p, Format::C).unwrap(),
            "(a >= 0 && a <= 9 && b >= 2) || a == 20"
        );
        let u = parse_single("{ A[a] }", false).unwrap();
        assert_eq!(poly(&u, Format::C).unwrap(), "1");
    }

    #[test]
    fn polylib_rows() {
        let p = parse_single("{ A[a] : 0 <= a <= 9 }", false).unwrap();
        assert_eq!(poly(&p, Format::PolyLib).unwrap(), "1\n\n2 3\n  1   1   0\n  1  -1   9\n");
    }

    #[test]
    fn polylib_rows_at_the_extremes_of_i64() {
        let mut p = parse_single("{ A[a] }", false).unwrap();
        p.cells[0][0] = Interval {
            lo: Some(i64::MIN),
            hi: Some(i64::MAX),
        };
        let text = poly(&p, Format::PolyLib).unwrap();
        assert!(text.contains("  1   1 9223372036854775808\n"), "{}", text);
        assert!(text.contains("  1  -1 9223372036854775807\n"), "{}", text);
    }

    #[test]
    fn linear_terms() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(linear(&[1, -2], 3, &names, false), "a - 2b + 3");
        assert_eq!(linear(&[-1, 2], -3, &names, true), "-a + 2 * b - 3");
        assert_eq!(linear(&[0, 0], -3, &names, false), "-3");
    }
}
