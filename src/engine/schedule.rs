//! Schedules: an ordered sequence of statement domains.
//!
//! Each domain carries the constant prefix that orders it relative to the
//! others; the schedule map sends every instance to that prefix.

use super::boxes::{Interval, Poly, UnionPoly};
use super::map::{RawUnionMap, UnionMapData};
use super::object::{binary, derive, refcounted, unary};
use super::set::{RawUnionSet, UnionSetData};
use super::space::{SpaceData, Tuple};

/// Payload of a schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleData {
    pub(crate) nparam: usize,
    pub(crate) entries: Vec<(Poly, Vec<i64>)>,
}

impl ScheduleData {
    fn depth(&self) -> usize {
        self.entries.iter().map(|(_, p)| p.len()).max().unwrap_or(0)
    }

    fn sequence(&self, next: &ScheduleData) -> Result<ScheduleData, String> {
        if self.nparam != next.nparam {
            return Err("sequence: parameter counts differ".to_string());
        }
        let mut entries = Vec::with_capacity(self.entries.len() + next.entries.len());
        for (step, part) in [(0, self), (1, next)] {
            for (domain, prefix) in &part.entries {
                let mut tagged = vec![step];
                tagged.extend_from_slice(prefix);
                entries.push((domain.clone(), tagged));
            }
        }
        Ok(ScheduleData {
            nparam: self.nparam,
            entries,
        })
    }

    fn intersect_domain(&self, domain: &UnionPoly) -> Result<ScheduleData, String> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (d, prefix) in &self.entries {
            entries.push((d.intersect(&domain.extract(&d.space))?, prefix.clone()));
        }
        Ok(ScheduleData {
            nparam: self.nparam,
            entries,
        })
    }

    pub(crate) fn domain(&self) -> Result<UnionPoly, String> {
        let mut out = UnionPoly::new(self.nparam);
        for (domain, _) in &self.entries {
            out.add(domain.clone())?;
        }
        Ok(out)
    }

    pub(crate) fn map(&self) -> Result<UnionPoly, String> {
        let depth = self.depth();
        let mut out = UnionPoly::new(self.nparam);
        for (domain, prefix) in &self.entries {
            let space = SpaceData {
                params: domain.space.params.clone(),
                input: domain.space.output.clone(),
                output: Some(Tuple::anonymous(depth)),
            };
            let mut padded = prefix.clone();
            padded.resize(depth, 0);
            let cells = domain
                .cells
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    c.extend(padded.iter().map(|&v| Interval::point(v)));
                    c
                })
                .collect();
            out.add(Poly { space, cells })?;
        }
        Ok(out)
    }
}

refcounted!(
    /// Engine schedule object.
    RawSchedule = ScheduleData,
    schedule_copy,
    schedule_free,
    schedule_get_ctx
);

/// Schedule executing every instance of `domain` at the same time (take).
///
/// # Safety
///
/// `domain` must be null or a live union set owned by the caller.
pub unsafe fn schedule_from_domain(domain: *mut RawUnionSet) -> *mut RawSchedule {
    // SAFETY: forwarded from the caller.
    unsafe {
        unary(domain, |u: &UnionSetData| {
            Ok(ScheduleData {
                nparam: u.0.nparam,
                entries: u.0.parts.iter().map(|p| (p.clone(), Vec::new())).collect(),
            })
        })
    }
}

/// `a` followed by `b` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live schedules owned by the caller.
pub unsafe fn schedule_sequence(a: *mut RawSchedule, b: *mut RawSchedule) -> *mut RawSchedule {
    // SAFETY: forwarded from the caller.
    unsafe { binary(a, b, ScheduleData::sequence) }
}

/// Restrict every statement domain to `domain` (take, take).
///
/// # Safety
///
/// Both pointers must be null or live objects owned by the caller.
pub unsafe fn schedule_intersect_domain(s: *mut RawSchedule, domain: *mut RawUnionSet) -> *mut RawSchedule {
    // SAFETY: forwarded from the caller.
    unsafe { binary(s, domain, |s: &ScheduleData, u: &UnionSetData| s.intersect_domain(&u.0)) }
}

/// Map from statement instances to their time stamps (keep).
///
/// # Safety
///
/// `s` must be a live schedule.
pub unsafe fn schedule_get_map(s: *const RawSchedule) -> *mut RawUnionMap {
    // SAFETY: forwarded from the caller.
    unsafe { derive(s, |s: &ScheduleData| Ok(UnionMapData(s.map()?))) }
}

/// All statement instances (keep).
///
/// # Safety
///
/// `s` must be a live schedule.
pub unsafe fn schedule_get_domain(s: *const RawSchedule) -> *mut RawUnionSet {
    // SAFETY: forwarded from the caller.
    unsafe { derive(s, |s: &ScheduleData| Ok(UnionSetData(s.domain()?))) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parse::parse_single;

    #[test]
    fn sequence_prefixes_and_pads() {
        let single = |text: &str, prefix: Vec<i64>| ScheduleData {
            nparam: 0,
            entries: vec![(parse_single(text, false).unwrap(), prefix)],
        };
        let first = single("{ S[i] : 0 <= i <= 3 }", vec![5]);
        let second = single("{ T[j] : j = 7 }", Vec::new());
        let map = first.sequence(&second).unwrap().map().unwrap();
        assert_eq!(map.parts.len(), 2);
        let t = &map.parts[1];
        assert_eq!(t.space.n_out(), 2);
        assert_eq!(
            t.cells,
            vec![vec![Interval::point(7), Interval::point(1), Interval::point(0)]]
        );
    }

    #[test]
    fn intersect_domain_keeps_prefixes() {
        let s = ScheduleData {
            nparam: 0,
            entries: vec![(parse_single("{ S[i] : 0 <= i <= 9 }", false).unwrap(), vec![2])],
        };
        let mut filter = UnionPoly::new(0);
        filter.add(parse_single("{ S[i] : i >= 5 }", false).unwrap()).unwrap();
        let cut = s.intersect_domain(&filter).unwrap();
        assert_eq!(cut.entries[0].1, vec![2]);
        assert_eq!(
            cut.entries[0].0.cells,
            vec![vec![Interval { lo: Some(5), hi: Some(9) }]]
        );
    }
}
