use bson::{Bson, Document as BsonDocument};
use std::time::Instant;

use super::cursor::Cursor;
use super::eval::{compare_documents, eval_document, get_path, project_document, set_path, unset_path};
use super::telemetry;
use super::types::{DeleteReport, Filter, FindOptions, MAX_SORT_FIELDS, Projection, UpdateDoc, UpdateReport};
use crate::collection::Collection;
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::index::IndexPlan;
use crate::utils::num::{as_f64, int_bson, u128_to_u64, usize_to_u64};

/// Matching documents in natural order plus the work it took to find them.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    pub docs: Vec<Document>,
    pub plan: Option<IndexPlan>,
    pub keys_examined: usize,
    pub docs_examined: usize,
}

/// Collect documents matching `filter`, stopping after `max` matches when given.
///
/// An index plan only narrows the candidates; they are re-checked against the whole filter
/// and visited in natural order, so results never depend on which indexes exist.
pub(crate) fn select(col: &Collection, filter: &Filter, max: Option<usize>) -> Selection {
    let max = max.unwrap_or(usize::MAX);
    let store = col.store.read();
    let scanned = {
        let mut indexes = col.indexes.write();
        indexes.plan(filter).and_then(|p| indexes.execute(&p).map(|scan| (p, scan)))
    };
    let mut out = Selection::default();
    match scanned {
        Some((plan, scan)) => {
            let mut seqs: Vec<u64> = scan.ids.iter().filter_map(|id| store.seq_of(id)).collect();
            seqs.sort_unstable();
            seqs.dedup();
            out.keys_examined = scan.keys_examined;
            for doc in seqs.iter().filter_map(|s| store.get_by_seq(*s)) {
                if out.docs.len() >= max {
                    break;
                }
                out.docs_examined += 1;
                if eval_document(doc, filter) {
                    out.docs.push(doc.clone());
                }
            }
            out.plan = Some(plan);
        }
        None => {
            for doc in store.iter() {
                if out.docs.len() >= max {
                    break;
                }
                out.docs_examined += 1;
                if eval_document(doc, filter) {
                    out.docs.push(doc.clone());
                }
            }
        }
    }
    out
}

/// Slice `[skip, skip + limit)`; a limit of zero means no limit.
pub(crate) fn paginate<T>(items: Vec<T>, skip: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let take = match limit {
        None | Some(0) => usize::MAX,
        Some(n) => n,
    };
    items.into_iter().skip(skip.unwrap_or(0)).take(take).collect()
}

/// Apply sort then pagination, the order every find uses.
pub(crate) fn order_and_page(mut docs: Vec<Document>, opts: &FindOptions) -> Vec<Document> {
    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec has {} keys; only the first {MAX_SORT_FIELDS} apply", sort.len());
        }
        // stable: ties keep natural order
        docs.sort_by(|a, b| compare_documents(a, b, sort));
    }
    paginate(docs, opts.skip, opts.limit)
}

/// Body with `_id` first, or the projected view.
#[must_use]
pub fn to_row(doc: &Document, projection: Option<&Projection>) -> BsonDocument {
    if let Some(p) = projection {
        return project_document(doc, p);
    }
    let mut row = BsonDocument::new();
    row.insert(ID_FIELD, doc.id_bson());
    for (k, v) in doc.body() {
        if k != ID_FIELD {
            row.insert(k.clone(), v.clone());
        }
    }
    row
}

fn emit_read(col: &Collection, op: &str, filter: &Filter, start: Instant, sel: &Selection, returned: usize) {
    let dur_ms = start.elapsed().as_millis();
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"{}\",\"collection\":\"{}\",\"duration_ms\":{},\"used_index\":{},\"docs_examined\":{},\"result_count\":{}}}",
        op,
        col.name,
        u128_to_u64(dur_ms),
        sel.plan.is_some(),
        usize_to_u64(sel.docs_examined),
        usize_to_u64(returned)
    );
    telemetry::log_query(&col.name, op, &format!("{filter:?}"), dur_ms, returned);
}

#[must_use]
pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Cursor {
    let start = Instant::now();
    let mut sel = select(col, filter, None);
    let docs = order_and_page(std::mem::take(&mut sel.docs), opts);
    let rows: Vec<BsonDocument> = docs.iter().map(|d| to_row(d, opts.projection.as_ref())).collect();
    emit_read(col, "find", filter, start, &sel, rows.len());
    Cursor::new(rows)
}

/// Like `find_docs` but yields the stored documents themselves, unprojected.
#[must_use]
pub fn find_documents(col: &Collection, filter: &Filter, opts: &FindOptions) -> Vec<Document> {
    let start = Instant::now();
    let mut sel = select(col, filter, None);
    let docs = order_and_page(std::mem::take(&mut sel.docs), opts);
    emit_read(col, "find", filter, start, &sel, docs.len());
    docs
}

/// First match in natural order.
#[must_use]
pub fn find_one(col: &Collection, filter: &Filter, projection: Option<&Projection>) -> Option<BsonDocument> {
    let start = Instant::now();
    let sel = select(col, filter, Some(1));
    let row = sel.docs.first().map(|d| to_row(d, projection));
    emit_read(col, "find_one", filter, start, &sel, usize::from(row.is_some()));
    row
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    let start = Instant::now();
    let sel = select(col, filter, None);
    let n = sel.docs.len();
    emit_read(col, "count", filter, start, &sel, n);
    n
}

/// # Errors
/// Returns an error for an invalid update or if the storage engine rejects the write.
pub fn update_one(col: &Collection, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
    update.validate()?;
    let _w = col.write_lock.lock();
    let sel = select(col, filter, Some(1));
    let mut report = UpdateReport::default();
    if let Some(doc) = sel.docs.into_iter().next() {
        report.matched = 1;
        report.modified = u64::from(apply_and_store(col, doc, update)?);
    }
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"update_one\",\"collection\":\"{}\",\"matched\":{},\"modified\":{}}}",
        col.name,
        report.matched,
        report.modified
    );
    Ok(report)
}

/// # Errors
/// Returns an error for an invalid update or if the storage engine rejects a write. Documents
/// updated before the failure stay updated.
pub fn update_many(col: &Collection, filter: &Filter, update: &UpdateDoc) -> Result<UpdateReport, DbError> {
    update.validate()?;
    let start = Instant::now();
    let _w = col.write_lock.lock();
    let sel = select(col, filter, None);
    let mut report = UpdateReport::default();
    for doc in sel.docs {
        report.matched += 1;
        if apply_and_store(col, doc, update)? {
            report.modified += 1;
        }
    }
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"update_many\",\"collection\":\"{}\",\"duration_ms\":{},\"matched\":{},\"modified\":{}}}",
        col.name,
        u128_to_u64(start.elapsed().as_millis()),
        report.matched,
        report.modified
    );
    Ok(report)
}

fn apply_and_store(col: &Collection, mut doc: Document, update: &UpdateDoc) -> Result<bool, DbError> {
    let mut body = doc.body().clone();
    if !apply_update(&mut body, update)? {
        return Ok(false);
    }
    doc.update(body);
    col.update_document(doc)
}

/// # Errors
/// Returns an error if the storage engine rejects the delete.
pub fn delete_one(col: &Collection, filter: &Filter) -> Result<DeleteReport, DbError> {
    let _w = col.write_lock.lock();
    let sel = select(col, filter, Some(1));
    let mut report = DeleteReport::default();
    if let Some(doc) = sel.docs.first() {
        report.deleted = u64::from(col.delete_document(&doc.id)?);
    }
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"delete_one\",\"collection\":\"{}\",\"deleted\":{}}}",
        col.name,
        report.deleted
    );
    Ok(report)
}

/// # Errors
/// Returns an error if the storage engine rejects a delete.
pub fn delete_many(col: &Collection, filter: &Filter) -> Result<DeleteReport, DbError> {
    let start = Instant::now();
    let _w = col.write_lock.lock();
    let sel = select(col, filter, None);
    let mut report = DeleteReport::default();
    for doc in &sel.docs {
        if col.delete_document(&doc.id)? {
            report.deleted += 1;
        }
    }
    crate::devlog!(
        "{{\"bench\":\"query\",\"op\":\"delete_many\",\"collection\":\"{}\",\"duration_ms\":{},\"deleted\":{}}}",
        col.name,
        u128_to_u64(start.elapsed().as_millis()),
        report.deleted
    );
    Ok(report)
}

/// Apply `$set`, `$inc` and `$unset` to `doc`. Returns true if anything changed.
///
/// # Errors
/// Returns `DbError::QueryError` when `$inc` targets a non-numeric value or a dotted path
/// runs through a non-document value.
pub fn apply_update(doc: &mut BsonDocument, upd: &UpdateDoc) -> Result<bool, DbError> {
    let mut changed = false;
    for (k, v) in &upd.set {
        changed |= set_path(doc, k, v.clone())?;
    }
    for (k, by) in &upd.inc {
        let current = get_path(doc, k).cloned().unwrap_or(Bson::Int32(0));
        let next = add_numbers(&current, by)
            .ok_or_else(|| DbError::QueryError(format!("cannot $inc non-numeric field '{k}'")))?;
        changed |= set_path(doc, k, next)?;
    }
    for k in &upd.unset {
        changed |= unset_path(doc, k);
    }
    Ok(changed)
}

/// Integer + integer stays integral (widening to Int64 as needed); anything else is a double.
fn add_numbers(a: &Bson, b: &Bson) -> Option<Bson> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(int_bson(i64::from(*x) + i64::from(*y))),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let x = crate::utils::num::as_i64(a)?;
            let y = crate::utils::num::as_i64(b)?;
            Some(x.checked_add(y).map_or_else(|| Bson::Double(x as f64 + y as f64), Bson::Int64))
        }
        _ => Some(Bson::Double(as_f64(a)? + as_f64(b)?)),
    }
}
