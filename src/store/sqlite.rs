//! SQLite-backed graph store
//!
//! Single database file with tables for laws, units, structural edges, and
//! the domain mirror. Embeddings are stored as little-endian f32 blobs and
//! scored with a filtered scan; the containment hierarchy and `IMPLEMENTS`
//! chain are resolved with indexed lookups. Thread-safe via an internal
//! mutex on the connection.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

use super::traits::{GraphStore, OpenStore, StoreError, StoreResult, StoreStats};
use crate::embedding::cosine_similarity;
use crate::graph::{
    Document, Domain, DomainId, NeighborEdge, NeighborKind, NodeKind, ParagraphInfo,
    RelationMatch, UnitId,
};

/// Maximum containment depth walked when resolving a unit's article.
/// The legal hierarchy is at most law/chapter/section/article/paragraph/
/// item/sub_item deep; anything beyond that is corrupt data.
const MAX_ANCESTOR_WALK: usize = 8;

/// SQLite-backed graph store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            -- Laws
            CREATE TABLE IF NOT EXISTS laws (
                name TEXT PRIMARY KEY,
                ingested_at TEXT NOT NULL
            );

            -- Statutory units; embedding is a little-endian f32 blob
            CREATE TABLE IF NOT EXISTS units (
                full_id TEXT PRIMARY KEY,
                law TEXT NOT NULL,
                kind TEXT NOT NULL,
                parent_full_id TEXT,
                ord INTEGER NOT NULL,
                title TEXT,
                content TEXT,
                embedding BLOB
            );
            CREATE INDEX IF NOT EXISTS idx_units_parent
                ON units(parent_full_id);
            CREATE INDEX IF NOT EXISTS idx_units_law
                ON units(law, kind);

            -- Sequential order within a parent (browsing consumers only)
            CREATE TABLE IF NOT EXISTS next_edges (
                prev_full_id TEXT NOT NULL,
                next_full_id TEXT NOT NULL,
                PRIMARY KEY (prev_full_id, next_full_id)
            );

            -- law -> law implementation chain
            CREATE TABLE IF NOT EXISTS implements (
                implementing TEXT NOT NULL,
                implemented TEXT NOT NULL,
                PRIMARY KEY (implementing, implemented)
            );

            -- Containment-edge contexts; embedding is an f32 blob
            CREATE TABLE IF NOT EXISTS relation_contexts (
                parent_full_id TEXT NOT NULL,
                child_full_id TEXT NOT NULL,
                context_text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (parent_full_id, child_full_id)
            );

            -- Domain mirror
            CREATE TABLE IF NOT EXISTS domains (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                centroid BLOB NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS domain_members (
                paragraph_id TEXT PRIMARY KEY,
                domain_id TEXT NOT NULL,
                similarity REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_domain_members_domain
                ON domain_members(domain_id);
            CREATE TABLE IF NOT EXISTS domain_neighbors (
                domain_id TEXT NOT NULL,
                neighbor_id TEXT NOT NULL,
                PRIMARY KEY (domain_id, neighbor_id)
            );

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn vec_to_blob(v: &[f32]) -> Vec<u8> {
        let mut blob = Vec::with_capacity(v.len() * 4);
        for x in v {
            blob.extend_from_slice(&x.to_le_bytes());
        }
        blob
    }

    fn blob_to_vec(blob: &[u8]) -> StoreResult<Vec<f32>> {
        if blob.len() % 4 != 0 {
            return Err(StoreError::Corrupt(format!(
                "embedding blob of {} bytes is not a multiple of 4",
                blob.len()
            )));
        }
        Ok(blob
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Walk the containment chain up to the nearest article.
    ///
    /// Returns `(article_label, depth_exhausted)`; the label is the article's
    /// title when present, its id otherwise, or the unit's own parent id when
    /// no article ancestor exists.
    fn resolve_article(conn: &Connection, mut parent: Option<String>) -> StoreResult<String> {
        let mut fallback = parent.clone().unwrap_or_default();
        for _ in 0..MAX_ANCESTOR_WALK {
            let Some(current) = parent else { break };
            let row: Option<(String, Option<String>, Option<String>)> = conn
                .query_row(
                    "SELECT kind, title, parent_full_id FROM units WHERE full_id = ?1",
                    params![current],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let Some((kind, title, grandparent)) = row else { break };
            if kind == NodeKind::Article.as_str() {
                return Ok(title.unwrap_or(current));
            }
            fallback = current;
            parent = grandparent;
        }
        Ok(fallback)
    }

    /// Laws reachable from `law` through `IMPLEMENTS` chains of length <= 2,
    /// walked in both directions, excluding `law` itself.
    fn laws_within_two_hops(conn: &Connection, law: &str) -> StoreResult<HashSet<String>> {
        let mut adjacency: HashMap<String, HashSet<String>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT implementing, implemented FROM implements")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (a, b) = row?;
            adjacency.entry(a.clone()).or_default().insert(b.clone());
            adjacency.entry(b).or_default().insert(a);
        }

        let mut reachable = HashSet::new();
        if let Some(first_hop) = adjacency.get(law) {
            for mid in first_hop {
                reachable.insert(mid.clone());
                if let Some(second_hop) = adjacency.get(mid) {
                    for far in second_hop {
                        reachable.insert(far.clone());
                    }
                }
            }
        }
        reachable.remove(law);
        Ok(reachable)
    }

    /// All embedded units of the given laws.
    fn embedded_units_of_laws(
        conn: &Connection,
        laws: &HashSet<String>,
    ) -> StoreResult<Vec<(UnitId, Vec<f32>)>> {
        let mut out = Vec::new();
        let mut stmt = conn.prepare(
            "SELECT full_id, embedding FROM units WHERE law = ?1 AND embedding IS NOT NULL",
        )?;
        for law in laws {
            let rows = stmt.query_map(params![law], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            for row in rows {
                let (id, blob) = row?;
                out.push((UnitId::from(id), Self::blob_to_vec(&blob)?));
            }
        }
        Ok(out)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn vector_search_paragraphs(
        &self,
        query: &[f32],
        top_k: usize,
        scope: Option<&HashSet<UnitId>>,
    ) -> StoreResult<Vec<(UnitId, f32)>> {
        if top_k == 0 || scope.is_some_and(|s| s.is_empty()) {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT full_id, embedding FROM units WHERE embedding IS NOT NULL")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut scored: Vec<(UnitId, f32)> = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            let id = UnitId::from(id);
            if scope.is_some_and(|s| !s.contains(&id)) {
                continue;
            }
            let embedding = Self::blob_to_vec(&blob)?;
            // Degenerate vectors are inert rather than an error
            if let Some(sim) = cosine_similarity(query, &embedding) {
                scored.push((id, sim));
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn neighbors(&self, id: &UnitId) -> StoreResult<Vec<(UnitId, NeighborEdge)>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, Option<String>, Option<Vec<u8>>)> = conn
            .query_row(
                "SELECT law, parent_full_id, embedding FROM units WHERE full_id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        // Unknown or inert units have no neighborhood
        let Some((law, parent_id, embedding)) = row else {
            return Ok(Vec::new());
        };
        if embedding.is_none() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<(UnitId, NeighborEdge)> = Vec::new();

        if let Some(ref parent) = parent_id {
            let parent_embedded: Option<bool> = conn
                .query_row(
                    "SELECT embedding IS NOT NULL FROM units WHERE full_id = ?1",
                    params![parent],
                    |row| row.get(0),
                )
                .optional()?;
            if parent_embedded == Some(true) {
                neighbors.push((
                    UnitId::from(parent.clone()),
                    NeighborEdge::structural(NeighborKind::Parent),
                ));
            }

            // Siblings share the containing article; they carry their
            // embedding so the expansion can price the hop.
            let mut stmt = conn.prepare(
                "SELECT full_id, embedding FROM units
                 WHERE parent_full_id = ?1 AND full_id != ?2 AND embedding IS NOT NULL",
            )?;
            let rows = stmt.query_map(params![parent, id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;
            for row in rows {
                let (sibling_id, blob) = row?;
                neighbors.push((
                    UnitId::from(sibling_id),
                    NeighborEdge::embedded(NeighborKind::Sibling, Self::blob_to_vec(&blob)?),
                ));
            }
        }

        let mut stmt = conn.prepare(
            "SELECT full_id FROM units
             WHERE parent_full_id = ?1 AND embedding IS NOT NULL",
        )?;
        let rows = stmt.query_map(params![id.as_str()], |row| row.get::<_, String>(0))?;
        for row in rows {
            neighbors.push((
                UnitId::from(row?),
                NeighborEdge::structural(NeighborKind::Child),
            ));
        }

        // Cross-law links: derived from the IMPLEMENTS chain, never stored
        let linked_laws = Self::laws_within_two_hops(&conn, &law)?;
        for (cross_id, cross_embedding) in Self::embedded_units_of_laws(&conn, &linked_laws)? {
            neighbors.push((
                cross_id,
                NeighborEdge::embedded(NeighborKind::CrossLaw, cross_embedding),
            ));
        }

        Ok(neighbors)
    }

    async fn paragraph_info(&self, id: &UnitId) -> StoreResult<Option<ParagraphInfo>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, Option<String>, Option<String>, Option<String>, i64)> = conn
            .query_row(
                "SELECT law, parent_full_id, title, content, ord FROM units WHERE full_id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((law, parent_id, title, content, order)) = row else {
            return Ok(None);
        };
        // A unit without text is structure, not a retrievable paragraph
        let Some(content) = content else {
            return Ok(None);
        };

        let article = Self::resolve_article(&conn, parent_id)?;
        let paragraph_marker = id
            .last_segment()
            .map(|s| s.to_string())
            .or(title)
            .unwrap_or_else(|| order.to_string());

        Ok(Some(ParagraphInfo {
            full_id: id.clone(),
            law,
            article,
            paragraph_marker,
            content,
        }))
    }

    async fn vector_search_relations(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<RelationMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT parent_full_id, child_full_id, context_text, embedding FROM relation_contexts",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut matches: Vec<RelationMatch> = Vec::new();
        for row in rows {
            let (from_id, to_id, context_text, blob) = row?;
            let embedding = Self::blob_to_vec(&blob)?;
            if let Some(similarity) = cosine_similarity(query, &embedding) {
                matches.push(RelationMatch {
                    from_id: UnitId::from(from_id),
                    to_id: UnitId::from(to_id),
                    context_text,
                    similarity,
                });
            }
        }

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.from_id.cmp(&b.from_id))
                .then_with(|| a.to_id.cmp(&b.to_id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn upsert_domain(&self, domain: &Domain) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO domains (id, name, centroid, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                centroid = excluded.centroid
            "#,
            params![
                domain.id.as_str(),
                domain.name,
                Self::vec_to_blob(&domain.centroid),
                domain.created_at.to_rfc3339(),
            ],
        )?;

        tx.execute(
            "DELETE FROM domain_neighbors WHERE domain_id = ?1",
            params![domain.id.as_str()],
        )?;
        for neighbor in &domain.neighbors {
            tx.execute(
                "INSERT OR REPLACE INTO domain_neighbors (domain_id, neighbor_id) VALUES (?1, ?2)",
                params![domain.id.as_str(), neighbor.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn assign_paragraph_to_domain(
        &self,
        paragraph: &UnitId,
        domain: &DomainId,
        similarity: f32,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO domain_members (paragraph_id, domain_id, similarity)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(paragraph_id) DO UPDATE SET
                domain_id = excluded.domain_id,
                similarity = excluded.similarity
            "#,
            params![paragraph.as_str(), domain.as_str(), similarity],
        )?;
        Ok(())
    }

    async fn delete_domain(&self, domain: &DomainId) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM domains WHERE id = ?1", params![domain.as_str()])?;
        tx.execute(
            "DELETE FROM domain_members WHERE domain_id = ?1",
            params![domain.as_str()],
        )?;
        tx.execute(
            "DELETE FROM domain_neighbors WHERE domain_id = ?1 OR neighbor_id = ?1",
            params![domain.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn load_domains(&self) -> StoreResult<Vec<Domain>> {
        let conn = self.conn.lock().unwrap();

        let mut domains: Vec<Domain> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT id, name, centroid, created_at FROM domains ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            for row in rows {
                let (id, name, blob, created_at) = row?;
                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| StoreError::Corrupt(format!("domain timestamp: {e}")))?
                    .with_timezone(&chrono::Utc);
                index.insert(id.clone(), domains.len());
                domains.push(Domain {
                    id: DomainId::from_string(id),
                    name,
                    centroid: Self::blob_to_vec(&blob)?,
                    node_ids: HashSet::new(),
                    neighbors: HashSet::new(),
                    created_at,
                });
            }
        }

        let mut stmt = conn.prepare("SELECT paragraph_id, domain_id FROM domain_members")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (paragraph, domain) = row?;
            match index.get(&domain) {
                Some(&i) => {
                    domains[i].node_ids.insert(UnitId::from(paragraph));
                }
                None => {
                    warn!(target: "lexgraph::data_integrity", %domain, "membership row references a missing domain, skipping");
                }
            }
        }

        let mut stmt = conn.prepare("SELECT domain_id, neighbor_id FROM domain_neighbors")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (domain, neighbor) = row?;
            if let Some(&i) = index.get(&domain) {
                domains[i].neighbors.insert(DomainId::from_string(neighbor));
            }
        }

        Ok(domains)
    }

    async fn insert_document(&self, document: &Document) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO laws (name, ingested_at) VALUES (?1, ?2)
            ON CONFLICT(name) DO NOTHING
            "#,
            params![document.law_name, chrono::Utc::now().to_rfc3339()],
        )?;

        for unit in &document.units {
            tx.execute(
                r#"
                INSERT INTO units (full_id, law, kind, parent_full_id, ord, title, content)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(full_id) DO UPDATE SET
                    law = excluded.law,
                    kind = excluded.kind,
                    parent_full_id = excluded.parent_full_id,
                    ord = excluded.ord,
                    title = excluded.title,
                    content = excluded.content
                "#,
                params![
                    unit.full_id.as_str(),
                    document.law_name,
                    unit.kind.as_str(),
                    unit.parent_full_id.as_ref().map(|p| p.as_str()),
                    unit.order,
                    unit.title,
                    unit.content,
                ],
            )?;
        }

        // NEXT edges: consecutive orders within a parent
        let mut by_parent: HashMap<&UnitId, Vec<&crate::graph::Unit>> = HashMap::new();
        for unit in &document.units {
            if let Some(ref parent) = unit.parent_full_id {
                by_parent.entry(parent).or_default().push(unit);
            }
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by_key(|u| u.order);
            for pair in siblings.windows(2) {
                tx.execute(
                    "INSERT OR REPLACE INTO next_edges (prev_full_id, next_full_id) VALUES (?1, ?2)",
                    params![pair[0].full_id.as_str(), pair[1].full_id.as_str()],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn link_implements(&self, implementing: &str, implemented: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO implements (implementing, implemented) VALUES (?1, ?2)",
            params![implementing, implemented],
        )?;
        Ok(())
    }

    async fn set_paragraph_embedding(&self, id: &UnitId, embedding: &[f32]) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE units SET embedding = ?1 WHERE full_id = ?2",
            params![Self::vec_to_blob(embedding), id.as_str()],
        )?;
        Ok(())
    }

    async fn set_relation_context(
        &self,
        parent: &UnitId,
        child: &UnitId,
        context_text: &str,
        embedding: &[f32],
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO relation_contexts (parent_full_id, child_full_id, context_text, embedding)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(parent_full_id, child_full_id) DO UPDATE SET
                context_text = excluded.context_text,
                embedding = excluded.embedding
            "#,
            params![
                parent.as_str(),
                child.as_str(),
                context_text,
                Self::vec_to_blob(embedding),
            ],
        )?;
        Ok(())
    }

    async fn paragraph_embeddings(&self) -> StoreResult<Vec<(UnitId, Vec<f32>)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT full_id, embedding FROM units WHERE embedding IS NOT NULL")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            out.push((UnitId::from(id), Self::blob_to_vec(&blob)?));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    async fn paragraph_laws(&self) -> StoreResult<HashMap<UnitId, String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT full_id, law FROM units WHERE embedding IS NOT NULL")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, law) = row?;
            out.insert(UnitId::from(id), law);
        }
        Ok(out)
    }

    async fn linked_law_pairs(&self) -> StoreResult<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut laws: Vec<String> = Vec::new();
        {
            let mut stmt = conn.prepare("SELECT name FROM laws ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                laws.push(row?);
            }
        }

        let mut pairs: HashSet<(String, String)> = HashSet::new();
        for law in &laws {
            for linked in Self::laws_within_two_hops(&conn, law)? {
                let pair = if *law < linked {
                    (law.clone(), linked)
                } else {
                    (linked, law.clone())
                };
                pairs.insert(pair);
            }
        }

        let mut out: Vec<(String, String)> = pairs.into_iter().collect();
        out.sort();
        Ok(out)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn.lock().unwrap();
        let count = |sql: &str| -> StoreResult<usize> {
            Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))? as usize)
        };
        Ok(StoreStats {
            laws: count("SELECT COUNT(*) FROM laws")?,
            units: count("SELECT COUNT(*) FROM units")?,
            paragraphs: count("SELECT COUNT(*) FROM units WHERE kind = 'paragraph'")?,
            embedded_paragraphs: count(
                "SELECT COUNT(*) FROM units WHERE embedding IS NOT NULL",
            )?,
            relation_contexts: count("SELECT COUNT(*) FROM relation_contexts")?,
            domains: count("SELECT COUNT(*) FROM domains")?,
        })
    }
}
