//! Static browser client, compiled into the binary.

#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub content_type: &'static str,
    pub body: &'static str,
}

const INDEX: Asset = Asset {
    content_type: "text/html; charset=utf-8",
    body: include_str!("assets/index.html"),
};

const STYLES: Asset = Asset {
    content_type: "text/css; charset=utf-8",
    body: include_str!("assets/styles.css"),
};

const SCRIPT: Asset = Asset {
    content_type: "application/javascript; charset=utf-8",
    body: include_str!("assets/app.js"),
};

/// Resolves a request path to a bundled file.
pub fn lookup(path: &str) -> Option<Asset> {
    match path {
        "/" | "/index.html" => Some(INDEX),
        "/styles.css" => Some(STYLES),
        "/app.js" => Some(SCRIPT),
        _ => None,
    }
}
