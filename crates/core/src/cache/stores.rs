//! SQLite implementation of [`CacheStorage`].

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use super::{CacheStorage, check_cacheable};
use crate::Error;
use crate::http::{Request, Response};

type EntryRow = (u16, String, String, Vec<u8>);

fn decode_entry((status, status_text, headers_json, body): EntryRow) -> Result<Response, Error> {
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    Ok(Response { status, status_text, headers, body })
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        check_cacheable(request, response)?;

        let name = name.to_string();
        let url = request.cache_url();
        let key_hash = compute_cache_key(&request.method, &url);
        let method = request.method.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![&name, &now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                    store, key_hash, method, url, status, status_text, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(store, key_hash) DO UPDATE SET
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &name,
                        &key_hash,
                        &method,
                        &url,
                        response.status,
                        &response.status_text,
                        &headers_json,
                        &response.body,
                        &now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key_hash = compute_cache_key(&request.method, &request.cache_url());
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, status_text, headers_json, body
                         FROM cache_entries WHERE store = ?1 AND key_hash = ?2",
                        params![name, key_hash],
                        read_entry,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_cache_key(&request.method, &request.cache_url());
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.status, e.status_text, e.headers_json, e.body
                         FROM cache_entries e JOIN cache_stores s ON s.name = e.store
                         WHERE e.key_hash = ?1
                         ORDER BY s.rowid ASC LIMIT 1",
                        params![key_hash],
                        read_entry,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE store = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> Request {
        Request::parse_get(&format!("https://wallai.test{path}")).unwrap()
    }

    fn css() -> Response {
        Response::new(200, "body{}").with_header("Content-Type", "text/css")
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("wallai-v1", &get("/static/css/style.css"), &css()).await.unwrap();

        let hit = db.match_in("wallai-v1", &get("/static/css/style.css")).await.unwrap().unwrap();
        assert_eq!(hit, css());
        assert!(db.match_in("wallai-v1", &get("/missing.css")).await.unwrap().is_none());
        assert!(db.match_in("other", &get("/static/css/style.css")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("/api/budgets/");
        db.put("api", &req, &Response::new(200, "[1]")).await.unwrap();
        db.put("api", &req, &Response::new(200, "[1,2]")).await.unwrap();

        let hit = db.match_in("api", &req).await.unwrap().unwrap();
        assert_eq!(hit.body, b"[1,2]");
        assert_eq!(db.entries("api").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = Request::new("DELETE", get("/budgets/api/delete/1/").url);
        let result = db.put("api", &req, &Response::new(200, "{}")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!db.has("api").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_in_creation_order_and_delete_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("wallai-v0.9.0").await.unwrap();
        db.put("wallai-v1.0.0", &get("/"), &Response::new(200, "<html>")).await.unwrap();
        db.put("wallai-v0.9.0", &get("/"), &Response::new(200, "<old>")).await.unwrap();

        assert_eq!(db.keys().await.unwrap(), vec!["wallai-v0.9.0", "wallai-v1.0.0"]);

        let any = db.match_any(&get("/")).await.unwrap().unwrap();
        assert_eq!(any.body, b"<old>");

        assert!(db.delete("wallai-v0.9.0").await.unwrap());
        assert!(!db.delete("wallai-v0.9.0").await.unwrap());

        let any = db.match_any(&get("/")).await.unwrap().unwrap();
        assert_eq!(any.body, b"<html>");
        assert!(db.entries("wallai-v0.9.0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("s", &get("/dashboard/#budgets"), &Response::new(200, "x")).await.unwrap();
        assert!(db.match_in("s", &get("/dashboard/")).await.unwrap().is_some());
    }
}
