use std::collections::HashMap;

use super::key::{IndexKeyKind, key_from_bson};
use crate::query::{CmpOp, Filter, Order};

/// Bounds on one index field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBounds {
    Eq(IndexKeyKind),
    Range { lower: Option<(IndexKeyKind, bool)>, upper: Option<(IndexKeyKind, bool)> },
}

// Missing and null share a family so `{field: null}` can scan both.
const fn family(k: &IndexKeyKind) -> u8 {
    match k {
        IndexKeyKind::Missing | IndexKeyKind::Null => 0,
        IndexKeyKind::Num(_) => 1,
        IndexKeyKind::Str(_) => 2,
        IndexKeyKind::Bool(_) => 3,
    }
}

impl FieldBounds {
    /// Where a walk in `order` direction should start, `None` for the beginning.
    #[must_use]
    pub fn seek_kind(&self, order: Order) -> Option<IndexKeyKind> {
        match (self, order) {
            (Self::Eq(k), _) => Some(k.clone()),
            (Self::Range { lower, .. }, Order::Asc) => lower.as_ref().map(|(k, _)| k.clone()),
            (Self::Range { upper, .. }, Order::Desc) => upper.as_ref().map(|(k, _)| k.clone()),
        }
    }

    /// True once a walk in `order` direction can no longer find keys inside these bounds.
    #[must_use]
    pub fn is_past_end(&self, kind: &IndexKeyKind, order: Order) -> bool {
        match (self, order) {
            (Self::Eq(k), _) => kind != k,
            (Self::Range { upper: Some((u, _)), .. }, Order::Asc) => kind > u,
            (Self::Range { lower: Some((l, _)), .. }, Order::Desc) => kind < l,
            _ => false,
        }
    }

    #[must_use]
    pub fn contains(&self, kind: &IndexKeyKind) -> bool {
        match self {
            Self::Eq(k) => kind == k,
            Self::Range { lower, upper } => {
                let lower_ok = lower.as_ref().is_none_or(|(l, incl)| {
                    family(kind) == family(l) && (kind > l || (*incl && kind == l))
                });
                let upper_ok = upper.as_ref().is_none_or(|(u, incl)| {
                    family(kind) == family(u) && (kind < u || (*incl && kind == u))
                });
                lower_ok && upper_ok
            }
        }
    }

    const fn is_eq(&self) -> bool {
        matches!(self, Self::Eq(_))
    }
}

#[derive(Debug, Default, Clone)]
struct PathPreds {
    eq: Option<IndexKeyKind>,
    lower: Option<(IndexKeyKind, bool)>,
    upper: Option<(IndexKeyKind, bool)>,
}

fn tighter_lower(cur: Option<(IndexKeyKind, bool)>, new: (IndexKeyKind, bool)) -> (IndexKeyKind, bool) {
    match cur {
        Some(c) if family(&c.0) != family(&new.0) || c.0 > new.0 || (c.0 == new.0 && !c.1) => c,
        _ => new,
    }
}

fn tighter_upper(cur: Option<(IndexKeyKind, bool)>, new: (IndexKeyKind, bool)) -> (IndexKeyKind, bool) {
    match cur {
        Some(c) if family(&c.0) != family(&new.0) || c.0 < new.0 || (c.0 == new.0 && !c.1) => c,
        _ => new,
    }
}

fn conjuncts<'a>(filter: &'a Filter, out: &mut Vec<&'a Filter>) {
    match filter {
        Filter::And(fs) => fs.iter().for_each(|f| conjuncts(f, out)),
        Filter::True => {}
        other => out.push(other),
    }
}

/// Per-field predicates usable by an index, taken from the top-level AND of `filter`.
fn collect_preds(filter: &Filter) -> HashMap<&str, PathPreds> {
    let mut parts = Vec::new();
    conjuncts(filter, &mut parts);
    let mut preds: HashMap<&str, PathPreds> = HashMap::new();
    for f in parts {
        let Filter::Cmp { path, op, value } = f else {
            continue;
        };
        if matches!(op, CmpOp::Ne) {
            continue;
        }
        let Some(k) = key_from_bson(value) else {
            continue;
        };
        let p = preds.entry(path.as_str()).or_default();
        match op {
            CmpOp::Eq if k == IndexKeyKind::Null => {
                p.lower = Some((IndexKeyKind::Missing, true));
                p.upper = Some((IndexKeyKind::Null, true));
            }
            CmpOp::Eq => {
                if p.eq.is_none() {
                    p.eq = Some(k);
                }
            }
            CmpOp::Gt => p.lower = Some(tighter_lower(p.lower.take(), (k, false))),
            CmpOp::Gte => p.lower = Some(tighter_lower(p.lower.take(), (k, true))),
            CmpOp::Lt => p.upper = Some(tighter_upper(p.upper.take(), (k, false))),
            CmpOp::Lte => p.upper = Some(tighter_upper(p.upper.take(), (k, true))),
            CmpOp::Ne => {}
        }
    }
    preds
}

/// Bounds `keys` can serve for `filter`: equality on a leading prefix plus at most one range.
#[must_use]
pub fn bounds_for(keys: &[(String, Order)], filter: &Filter) -> Vec<FieldBounds> {
    let preds = collect_preds(filter);
    let mut bounds = Vec::new();
    for (field, _) in keys {
        let Some(p) = preds.get(field.as_str()) else {
            break;
        };
        if let Some(eq) = &p.eq {
            bounds.push(FieldBounds::Eq(eq.clone()));
            continue;
        }
        if p.lower.is_some() || p.upper.is_some() {
            bounds.push(FieldBounds::Range { lower: p.lower.clone(), upper: p.upper.clone() });
        }
        break;
    }
    bounds
}

/// Ranking used to choose between candidate indexes; zero means unusable.
#[must_use]
pub fn score(bounds: &[FieldBounds]) -> usize {
    bounds.iter().map(|b| if b.is_eq() { 2 } else { 1 }).sum()
}
