//! Schedules: statement domains in execution order.

use crate::engine::printer::printer_print_schedule;
use crate::engine::schedule::{
    schedule_copy, schedule_free, schedule_from_domain, schedule_get_ctx, schedule_get_domain, schedule_get_map,
    schedule_intersect_domain, schedule_sequence, RawSchedule,
};
use crate::error::Result;
use crate::handle::Handle;
use crate::map::UnionMap;
use crate::printer::printable;
use crate::resource_kind;
use crate::set::UnionSet;

resource_kind! {
    /// Schedules.
    ScheduleKind => RawSchedule,
    name: "Schedule",
    copy: schedule_copy,
    free: schedule_free,
    context: schedule_get_ctx,
}

/// A schedule handle.
///
/// ```
/// use isle::{Context, Schedule, UnionMap, UnionSet};
///
/// let ctx = Context::new();
/// let init = Schedule::from_domain(&UnionSet::parse(&ctx, "{ S[i] : 0 <= i <= 9 }")?)?;
/// let body = Schedule::from_domain(&UnionSet::parse(&ctx, "{ T[j] : j = 0 }")?)?;
/// let program = Schedule::sequence(&init, &body)?;
///
/// let expected = UnionMap::parse(&ctx, "{ S[i] -> [t] : 0 <= i <= 9 and t = 0; T[j] -> [t] : j = 0 and t = 1 }")?;
/// assert!(program.map()?.is_equal(&expected)?);
/// # Ok::<(), isle::Error>(())
/// ```
pub type Schedule = Handle<ScheduleKind>;

impl Schedule {
    /// Execute every instance of `domain` at the same time.
    pub fn from_domain(domain: &UnionSet) -> Result<Self> {
        // SAFETY: the engine takes the fresh reference.
        Self::adopt(domain.context(), unsafe { schedule_from_domain(domain.copy_raw()) })
    }

    /// `first`, then `second`.
    pub fn sequence(first: &Schedule, second: &Schedule) -> Result<Self> {
        // SAFETY: the engine takes both fresh references.
        Self::adopt(first.context(), unsafe { schedule_sequence(first.copy_raw(), second.copy_raw()) })
    }

    /// Restrict every statement to the instances in `domain`.
    pub fn intersect_domain(&mut self, domain: &UnionSet) -> Result<()> {
        let domain = domain.copy_raw();
        // SAFETY: the engine takes both references.
        self.update(|raw| unsafe { schedule_intersect_domain(raw, domain) })
    }

    /// Statement instances to time stamps.
    pub fn map(&self) -> Result<UnionMap> {
        // SAFETY: the schedule is live.
        UnionMap::adopt(self.context(), unsafe { schedule_get_map(self.as_ptr()) })
    }

    /// Every scheduled statement instance.
    pub fn domain(&self) -> Result<UnionSet> {
        // SAFETY: the schedule is live.
        UnionSet::adopt(self.context(), unsafe { schedule_get_domain(self.as_ptr()) })
    }
}

printable!(Schedule, printer_print_schedule);
