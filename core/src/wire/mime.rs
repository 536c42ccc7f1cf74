/*
 * mime.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Filigrana, a compact event-driven HTTP/1.x
 * server and client.
 *
 * Filigrana is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Filigrana is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Filigrana.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Extension-to-MIME table used by the file-streaming encoder.

use std::path::Path;

const TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain; charset=utf-8"),
];

/// Content type for a file path, by extension; octet-stream when unknown.
pub fn for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| {
            TYPES
                .iter()
                .find(|(e, _)| ext.eq_ignore_ascii_case(e))
                .map(|(_, t)| *t)
        })
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup() {
        assert_eq!(for_path(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(for_path(Path::new("a/b/app.JS")), "application/javascript");
        assert_eq!(for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(for_path(Path::new("archive.tar.gz")), "application/octet-stream");
        assert_eq!(for_path(Path::new("no_extension")), "application/octet-stream");
    }
}
