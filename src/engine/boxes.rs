//! Box-domain arithmetic behind sets and maps.

use super::space::SpaceData;

/// Closed integer interval; `None` bounds are infinite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Interval {
    pub(crate) lo: Option<i64>,
    pub(crate) hi: Option<i64>,
}

impl Interval {
    pub(crate) const FULL: Interval = Interval { lo: None, hi: None };

    pub(crate) fn point(v: i64) -> Self {
        Interval {
            lo: Some(v),
            hi: Some(v),
        }
    }

    pub(crate) fn is_empty(self) -> bool {
        matches!((self.lo, self.hi), (Some(l), Some(h)) if l > h)
    }

    pub(crate) fn single(self) -> Option<i64> {
        match (self.lo, self.hi) {
            (Some(l), Some(h)) if l == h => Some(l),
            _ => None,
        }
    }

    pub(crate) fn intersect(self, o: Interval) -> Interval {
        let lo = match (self.lo, o.lo) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let hi = match (self.hi, o.hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Interval { lo, hi }
    }

    /// Containment over `i64`: an infinite bound equals the extreme value.
    pub(crate) fn contains(self, o: Interval) -> bool {
        if o.is_empty() {
            return true;
        }
        self.lo.unwrap_or(i64::MIN) <= o.lo.unwrap_or(i64::MIN)
            && self.hi.unwrap_or(i64::MAX) >= o.hi.unwrap_or(i64::MAX)
    }

    pub(crate) fn contains_value(self, v: i64) -> bool {
        self.lo.is_none_or(|l| l <= v) && self.hi.is_none_or(|h| v <= h)
    }

    /// Whether the union of two intervals is itself an interval.
    fn joins(self, o: Interval) -> bool {
        let touches = |hi: Option<i64>, lo: Option<i64>| match (hi, lo) {
            (Some(h), Some(l)) => h.saturating_add(1) >= l,
            _ => true,
        };
        touches(self.hi, o.lo) && touches(o.hi, self.lo)
    }

    fn hull(self, o: Interval) -> Interval {
        Interval {
            lo: self.lo.and_then(|a| o.lo.map(|b| a.min(b))),
            hi: self.hi.and_then(|a| o.hi.map(|b| a.max(b))),
        }
    }
}

/// One disjunct: an interval per column.
pub(crate) type Cell = Vec<Interval>;

pub(crate) fn cell_is_empty(cell: &[Interval]) -> bool {
    cell.iter().any(|i| i.is_empty())
}

pub(crate) fn cell_intersect(a: &[Interval], b: &[Interval]) -> Cell {
    a.iter().zip(b).map(|(x, y)| x.intersect(*y)).collect()
}

fn cell_contains(a: &[Interval], b: &[Interval]) -> bool {
    cell_is_empty(b) || a.iter().zip(b).all(|(x, y)| x.contains(*y))
}

/// `a \ b` as a list of disjoint cells.
fn cell_subtract(a: &[Interval], b: &[Interval]) -> Vec<Cell> {
    if cell_is_empty(&cell_intersect(a, b)) {
        return vec![a.to_vec()];
    }
    let mut pieces = Vec::new();
    let mut rest = a.to_vec();
    for d in 0..rest.len() {
        if let Some(bl) = b[d].lo {
            let below = rest[d].lo.is_none_or(|l| l < bl);
            if below {
                if let Some(hi) = bl.checked_sub(1) {
                    let mut piece = rest.clone();
                    piece[d].hi = Some(hi);
                    pieces.push(piece);
                }
                rest[d].lo = Some(bl);
            }
        }
        if let Some(bh) = b[d].hi {
            let above = rest[d].hi.is_none_or(|h| h > bh);
            if above {
                if let Some(lo) = bh.checked_add(1) {
                    let mut piece = rest.clone();
                    piece[d].lo = Some(lo);
                    pieces.push(piece);
                }
                rest[d].hi = Some(bh);
            }
        }
    }
    pieces
}

/// How a single affine constraint restricts a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Restriction {
    All,
    Nothing,
    Column(usize, Interval),
}

fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i128, b: i128) -> i128 {
    -div_floor(-a, b)
}

/// Translate `sum(coeffs[i] * x_i) + constant (>= | ==) 0` into a restriction.
///
/// Errors when the constraint couples several columns or a bound overflows.
pub(crate) fn restriction(coeffs: &[i64], constant: i64, equality: bool) -> Result<Restriction, String> {
    let used: Vec<usize> = (0..coeffs.len()).filter(|&i| coeffs[i] != 0).collect();
    let k = constant as i128;
    match used.as_slice() {
        [] => {
            let holds = if equality { k == 0 } else { k >= 0 };
            Ok(if holds {
                Restriction::All
            } else {
                Restriction::Nothing
            })
        }
        [col] => {
            let c = coeffs[*col] as i128;
            let fit = |v: i128| i64::try_from(v).map_err(|_| "bound out of range".to_string());
            let interval = if equality {
                if (-k) % c != 0 {
                    return Ok(Restriction::Nothing);
                }
                Interval::point(fit(-k / c)?)
            } else if c > 0 {
                Interval {
                    lo: Some(fit(div_ceil(-k, c))?),
                    hi: None,
                }
            } else {
                Interval {
                    lo: None,
                    hi: Some(fit(div_floor(k, -c))?),
                }
            };
            Ok(Restriction::Column(*col, interval))
        }
        _ => Err("constraint relates several dimensions; only box constraints are supported".to_string()),
    }
}

/// A space plus a finite union of cells over its columns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Poly {
    pub(crate) space: SpaceData,
    pub(crate) cells: Vec<Cell>,
}

/// Outcome of optimizing over a [`Poly`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Optimum<T> {
    Empty,
    Unbounded,
    Found(T),
}

impl Poly {
    pub(crate) fn universe(space: SpaceData) -> Self {
        let total = space.total();
        Poly {
            space,
            cells: vec![vec![Interval::FULL; total]],
        }
    }

    pub(crate) fn empty(space: SpaceData) -> Self {
        Poly {
            space,
            cells: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| cell_is_empty(c))
    }

    fn check_space(&self, other: &Poly, op: &str) -> Result<(), String> {
        if self.space.matches(&other.space) {
            Ok(())
        } else {
            Err(format!("{}: spaces do not match", op))
        }
    }

    pub(crate) fn intersect(&self, other: &Poly) -> Result<Poly, String> {
        self.check_space(other, "intersect")?;
        let mut cells = Vec::new();
        for a in &self.cells {
            for b in &other.cells {
                let c = cell_intersect(a, b);
                if !cell_is_empty(&c) {
                    cells.push(c);
                }
            }
        }
        Ok(Poly {
            space: self.space.clone(),
            cells,
        }
        .coalesced())
    }

    pub(crate) fn union(&self, other: &Poly) -> Result<Poly, String> {
        self.check_space(other, "union")?;
        let mut cells = self.cells.clone();
        cells.extend(other.cells.iter().cloned());
        Ok(Poly {
            space: self.space.clone(),
            cells,
        }
        .coalesced())
    }

    pub(crate) fn subtract(&self, other: &Poly) -> Result<Poly, String> {
        self.check_space(other, "subtract")?;
        let mut pieces: Vec<Cell> = self.cells.iter().filter(|c| !cell_is_empty(c)).cloned().collect();
        for b in &other.cells {
            pieces = pieces.iter().flat_map(|p| cell_subtract(p, b)).collect();
        }
        Ok(Poly {
            space: self.space.clone(),
            cells: pieces,
        }
        .coalesced())
    }

    pub(crate) fn is_subset(&self, other: &Poly) -> Result<bool, String> {
        Ok(self.subtract(other)?.is_empty())
    }

    pub(crate) fn is_equal(&self, other: &Poly) -> Result<bool, String> {
        Ok(self.is_subset(other)? && other.is_subset(self)?)
    }

    pub(crate) fn restrict(&mut self, r: Restriction) {
        match r {
            Restriction::All => {}
            Restriction::Nothing => self.cells.clear(),
            Restriction::Column(col, interval) => {
                for cell in &mut self.cells {
                    cell[col] = cell[col].intersect(interval);
                }
                self.cells.retain(|c| !cell_is_empty(c));
            }
        }
    }

    /// Drop empty and contained cells and merge neighbours that differ in one column.
    pub(crate) fn coalesced(mut self) -> Poly {
        self.cells.retain(|c| !cell_is_empty(c));
        loop {
            let mut changed = false;
            'scan: for i in 0..self.cells.len() {
                for j in 0..self.cells.len() {
                    if i == j {
                        continue;
                    }
                    if cell_contains(&self.cells[i], &self.cells[j]) {
                        self.cells.remove(j);
                        changed = true;
                        break 'scan;
                    }
                    let differing: Vec<usize> = (0..self.cells[i].len())
                        .filter(|&d| self.cells[i][d] != self.cells[j][d])
                        .collect();
                    if let [d] = differing.as_slice() {
                        let (a, b) = (self.cells[i][*d], self.cells[j][*d]);
                        if a.joins(b) {
                            self.cells[i][*d] = a.hull(b);
                            self.cells.remove(j);
                            changed = true;
                            break 'scan;
                        }
                    }
                }
            }
            if !changed {
                return self;
            }
        }
    }

    /// Lexicographic optimum over `columns` (in order), restricted to `cells`.
    fn lexopt_cells(cells: &[Cell], columns: &[usize], max: bool) -> Optimum<Vec<i64>> {
        let mut candidates: Vec<Cell> = cells.iter().filter(|c| !cell_is_empty(c)).cloned().collect();
        if candidates.is_empty() {
            return Optimum::Empty;
        }
        let mut point = Vec::with_capacity(columns.len());
        for &col in columns {
            let mut best: Option<i64> = None;
            for c in &candidates {
                let bound = if max { c[col].hi } else { c[col].lo };
                let Some(v) = bound else {
                    return Optimum::Unbounded;
                };
                best = Some(match best {
                    Some(b) if max => b.max(v),
                    Some(b) => b.min(v),
                    None => v,
                });
            }
            let Some(v) = best else {
                return Optimum::Empty;
            };
            candidates.retain(|c| c[col].contains_value(v));
            for c in &mut candidates {
                c[col] = Interval::point(v);
            }
            point.push(v);
        }
        Optimum::Found(point)
    }

    /// Lexicographic optimum of a set, as a full point over all columns.
    pub(crate) fn lexopt(&self, max: bool) -> Optimum<Vec<i64>> {
        let columns: Vec<usize> = (0..self.space.total()).collect();
        Self::lexopt_cells(&self.cells, &columns, max)
    }

    /// Optimum of `(coeffs . x + constant) / denom` over the set.
    pub(crate) fn affine_opt(&self, coeffs: &[i64], constant: i64, denom: i64, max: bool) -> Optimum<(i128, i64)> {
        let mut best: Option<i128> = None;
        for cell in self.cells.iter().filter(|c| !cell_is_empty(c)) {
            let mut total = constant as i128;
            for (col, &c) in coeffs.iter().enumerate() {
                if c == 0 {
                    continue;
                }
                let take_hi = (c > 0) == max;
                let bound = if take_hi { cell[col].hi } else { cell[col].lo };
                let Some(v) = bound else {
                    return Optimum::Unbounded;
                };
                total += c as i128 * v as i128;
            }
            best = Some(match best {
                Some(b) if max => b.max(total),
                Some(b) => b.min(total),
                None => total,
            });
        }
        match best {
            Some(b) => Optimum::Found((b, denom)),
            None => Optimum::Empty,
        }
    }

    /// Some point of the set, preferring lower bounds.
    pub(crate) fn sample(&self) -> Option<Vec<i64>> {
        let cell = self.cells.iter().find(|c| !cell_is_empty(c))?;
        Some(cell.iter().map(|i| i.lo.or(i.hi).unwrap_or(0)).collect())
    }

    // Map operations below use the `params ++ in ++ out` layout.

    fn split_columns(&self) -> (usize, usize, usize) {
        (self.space.n_param(), self.space.n_in(), self.space.n_out())
    }

    pub(crate) fn reverse(&self) -> Poly {
        let (np, ni, _) = self.split_columns();
        let cells = self
            .cells
            .iter()
            .map(|c| {
                let mut r = c[..np].to_vec();
                r.extend_from_slice(&c[np + ni..]);
                r.extend_from_slice(&c[np..np + ni]);
                r
            })
            .collect();
        Poly {
            space: self.space.reverse(),
            cells,
        }
    }

    pub(crate) fn domain(&self) -> Poly {
        let (np, ni, _) = self.split_columns();
        let cells = self.cells.iter().map(|c| c[..np + ni].to_vec()).collect();
        Poly {
            space: self.space.domain(),
            cells,
        }
        .coalesced()
    }

    pub(crate) fn range(&self) -> Poly {
        let (np, ni, _) = self.split_columns();
        let cells = self
            .cells
            .iter()
            .map(|c| {
                let mut r = c[..np].to_vec();
                r.extend_from_slice(&c[np + ni..]);
                r
            })
            .collect();
        Poly {
            space: self.space.range(),
            cells,
        }
        .coalesced()
    }

    /// Compose `self: A -> B` with `next: B -> C`.
    pub(crate) fn apply_range(&self, next: &Poly) -> Result<Poly, String> {
        if !self.space.range().matches(&next.space.domain()) {
            return Err("apply_range: range of the first map does not match domain of the second".to_string());
        }
        let (np, ni, _) = self.split_columns();
        let (_, ni2, _) = next.split_columns();
        let mut cells = Vec::new();
        for a in &self.cells {
            for b in &next.cells {
                let params = cell_intersect(&a[..np], &b[..np]);
                let mid = cell_intersect(&a[np + ni..], &b[np..np + ni2]);
                if cell_is_empty(&params) || cell_is_empty(&mid) {
                    continue;
                }
                let mut c = params;
                c.extend_from_slice(&a[np..np + ni]);
                c.extend_from_slice(&b[np + ni2..]);
                cells.push(c);
            }
        }
        Ok(Poly {
            space: SpaceData {
                params: self.space.params.clone(),
                input: self.space.input.clone(),
                output: next.space.output.clone(),
            },
            cells,
        }
        .coalesced())
    }

    /// Image of the set `self` under `map`.
    pub(crate) fn apply(&self, map: &Poly) -> Result<Poly, String> {
        if !self.space.matches(&map.space.domain()) {
            return Err("apply: set does not live in the domain of the map".to_string());
        }
        let np = self.space.n_param();
        let ni = map.space.n_in();
        let mut cells = Vec::new();
        for s in &self.cells {
            for m in &map.cells {
                let params = cell_intersect(&s[..np], &m[..np]);
                let mid = cell_intersect(&s[np..], &m[np..np + ni]);
                if cell_is_empty(&params) || cell_is_empty(&mid) {
                    continue;
                }
                let mut c = params;
                c.extend_from_slice(&m[np + ni..]);
                cells.push(c);
            }
        }
        Ok(Poly {
            space: map.space.range(),
            cells,
        }
        .coalesced())
    }

    pub(crate) fn is_single_valued(&self) -> bool {
        let (np, ni, _) = self.split_columns();
        let live: Vec<&Cell> = self.cells.iter().filter(|c| !cell_is_empty(c)).collect();
        let outputs: Vec<Option<Vec<i64>>> = live
            .iter()
            .map(|c| c[np + ni..].iter().map(|i| i.single()).collect())
            .collect();
        if outputs.iter().any(|o| o.is_none()) {
            return false;
        }
        for i in 0..live.len() {
            for j in i + 1..live.len() {
                let overlap = cell_intersect(&live[i][..np + ni], &live[j][..np + ni]);
                if !cell_is_empty(&overlap) && outputs[i] != outputs[j] {
                    return false;
                }
            }
        }
        true
    }

    /// For every domain point, the lexicographic optimum of its image.
    pub(crate) fn lexopt_map(&self, max: bool) -> Result<Poly, String> {
        const MAX_CELLS: usize = 4096;
        let (np, ni, no) = self.split_columns();
        let dcols = np + ni;
        let live: Vec<&Cell> = self.cells.iter().filter(|c| !cell_is_empty(c)).collect();

        // Elementary intervals per domain column.
        let mut axes: Vec<Vec<Interval>> = Vec::with_capacity(dcols);
        for col in 0..dcols {
            let mut cuts: Vec<i64> = Vec::new();
            for c in &live {
                if let Some(l) = c[col].lo {
                    cuts.push(l);
                }
                if let Some(cut) = c[col].hi.and_then(|h| h.checked_add(1)) {
                    cuts.push(cut);
                }
            }
            cuts.sort_unstable();
            cuts.dedup();
            let mut pieces = Vec::with_capacity(cuts.len() + 1);
            let mut prev: Option<i64> = None;
            for &cut in &cuts {
                if let Some(hi) = cut.checked_sub(1) {
                    pieces.push(Interval { lo: prev, hi: Some(hi) });
                }
                prev = Some(cut);
            }
            pieces.push(Interval { lo: prev, hi: None });
            axes.push(pieces);
        }
        let count = axes.iter().map(Vec::len).try_fold(1usize, |acc, n| acc.checked_mul(n));
        match count {
            Some(n) if n <= MAX_CELLS => {}
            _ => return Err("lexicographic optimum: domain too fragmented".to_string()),
        }

        let out_columns: Vec<usize> = (0..no).map(|i| dcols + i).collect();
        let mut cells = Vec::new();
        let mut index = vec![0usize; dcols];
        loop {
            let cell: Cell = (0..dcols).map(|d| axes[d][index[d]]).collect();
            let covering: Vec<Cell> = live
                .iter()
                .filter(|c| cell_contains(&c[..dcols], &cell))
                .map(|c| (*c).clone())
                .collect();
            if !covering.is_empty() && !cell_is_empty(&cell) {
                match Self::lexopt_cells(&covering, &out_columns, max) {
                    Optimum::Found(point) => {
                        let mut c = cell.clone();
                        c.extend(point.into_iter().map(Interval::point));
                        cells.push(c);
                    }
                    Optimum::Unbounded => return Err("lexicographic optimum is unbounded".to_string()),
                    Optimum::Empty => {}
                }
            }
            // Odometer over the per-column intervals.
            let mut d = 0;
            loop {
                if d == dcols {
                    return Ok(Poly {
                        space: self.space.clone(),
                        cells,
                    }
                    .coalesced());
                }
                index[d] += 1;
                if index[d] < axes[d].len() {
                    break;
                }
                index[d] = 0;
                d += 1;
            }
        }
    }
}

/// Several polys over distinct spaces.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct UnionPoly {
    pub(crate) nparam: usize,
    pub(crate) parts: Vec<Poly>,
}

impl UnionPoly {
    pub(crate) fn new(nparam: usize) -> Self {
        UnionPoly {
            nparam,
            parts: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, poly: Poly) -> Result<(), String> {
        if self.parts.is_empty() && self.nparam == 0 {
            self.nparam = poly.space.n_param();
        }
        if poly.space.n_param() != self.nparam {
            return Err("union: parameter counts differ".to_string());
        }
        match self.parts.iter_mut().find(|p| p.space.matches(&poly.space)) {
            Some(part) => *part = part.union(&poly)?,
            None => self.parts.push(poly),
        }
        Ok(())
    }

    pub(crate) fn union(&self, other: &UnionPoly) -> Result<UnionPoly, String> {
        let mut out = self.clone();
        for p in &other.parts {
            out.add(p.clone())?;
        }
        Ok(out)
    }

    pub(crate) fn extract(&self, space: &SpaceData) -> Poly {
        self.parts
            .iter()
            .find(|p| p.space.matches(space))
            .cloned()
            .unwrap_or_else(|| Poly::empty(space.clone()))
    }

    fn non_empty(&self) -> impl Iterator<Item = &Poly> {
        self.parts.iter().filter(|p| !p.is_empty())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.non_empty().next().is_none()
    }

    pub(crate) fn is_equal(&self, other: &UnionPoly) -> Result<bool, String> {
        for p in self.non_empty() {
            if !p.is_equal(&other.extract(&p.space))? {
                return Ok(false);
            }
        }
        for p in other.non_empty() {
            if !p.is_equal(&self.extract(&p.space))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(crate) fn map_parts(&self, f: impl Fn(&Poly) -> Poly) -> UnionPoly {
        UnionPoly {
            nparam: self.nparam,
            parts: self.parts.iter().map(f).collect(),
        }
    }
}
