// src/navigation.rs

use std::cell::RefCell;
use std::rc::Rc;

/// Where the browser currently is: `pathname`, `?search` and `#hash`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.find('#') {
            Some(i) => (&href[..i], &href[i..]),
            None => (href, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Navigation handle shared by the views of one window.
pub trait History {
    fn location(&self) -> &Location;
    fn push(&mut self, href: &str);
    fn replace(&mut self, href: &str);
    /// Returns false when there is nothing to go back to.
    fn go_back(&mut self) -> bool;
}

pub type SharedHistory = Rc<RefCell<dyn History>>;

pub struct MemoryHistory {
    entries: Vec<Location>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(href: &str) -> Self {
        Self {
            entries: vec![Location::parse(href)],
            index: 0,
        }
    }

    pub fn shared(href: &str) -> SharedHistory {
        Rc::new(RefCell::new(Self::new(href)))
    }
}

impl History for MemoryHistory {
    fn location(&self) -> &Location {
        &self.entries[self.index]
    }

    fn push(&mut self, href: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(Location::parse(href));
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, href: &str) {
        self.entries[self.index] = Location::parse(href);
    }

    fn go_back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }
}

/// A parsed `/<repo>[@<rev>]<rest>` path, where `rest` starts at `/-/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRevRoute {
    pub repo_name: String,
    pub rev: Option<String>,
    pub file_path: Option<String>,
    rest: String,
}

impl RepoRevRoute {
    pub fn parse(pathname: &str) -> Option<Self> {
        let path = pathname.strip_prefix('/')?;
        let (repo_rev, rest) = match path.find("/-/") {
            Some(i) => (&path[..i], &path[i..]),
            None => (path, ""),
        };
        if repo_rev.is_empty() {
            return None;
        }
        let (repo_name, rev) = match repo_rev.split_once('@') {
            Some((repo, rev)) => (repo, Some(percent_decode(rev))),
            None => (repo_rev, None),
        };
        if repo_name.is_empty() {
            return None;
        }
        let file_path = rest
            .strip_prefix("/-/blob/")
            .filter(|p| !p.is_empty())
            .map(percent_decode);
        Some(Self {
            repo_name: percent_decode(repo_name),
            rev: rev.filter(|r| !r.is_empty()),
            file_path,
            rest: rest.to_string(),
        })
    }
}

/// `@` in the repository name is escaped so it cannot be read as the
/// revision separator.
pub fn encode_repo_rev(repo_name: &str, rev: Option<&str>) -> String {
    let repo_name = escape_path(repo_name);
    match rev {
        Some(rev) if !rev.is_empty() => format!("{repo_name}@{}", escape_path(rev)),
        _ => repo_name,
    }
}

pub fn blob_url(repo_name: &str, rev: Option<&str>, file_path: &str) -> String {
    format!(
        "/{}/-/blob/{}",
        encode_repo_rev(repo_name, rev),
        escape_path(file_path)
    )
}

/// Points `href` at `new_rev`, keeping the rest of the path, the query string
/// and the fragment. Hrefs outside a repository route come back unchanged.
pub fn replace_revision_in_url(href: &str, new_rev: &str) -> String {
    let location = Location::parse(href);
    let Some(route) = RepoRevRoute::parse(&location.pathname) else {
        return href.to_string();
    };
    format!(
        "/{}{}{}{}",
        encode_repo_rev(&route.repo_name, Some(new_rev)),
        route.rest,
        location.search,
        location.hash
    )
}

/// Reads `key` from a `?a=1&b=2` query string.
pub fn query_param(search: &str, key: &str) -> Option<String> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| percent_decode(&v.replace('+', " ")))
}

/// Sets or removes (`None`) the given keys, keeping every other parameter.
pub fn with_query_params(search: &str, params: &[(&str, Option<String>)]) -> String {
    let mut pairs: Vec<String> = search
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !params.iter().any(|(k, _)| *k == key)
        })
        .map(str::to_string)
        .collect();
    for (key, value) in params {
        if let Some(value) = value {
            pairs.push(format!("{key}={}", escape(value, false)));
        }
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

// Slashes stay readable in repo names, branch names like `feature/x` and file paths.
fn escape_path(segment: &str) -> String {
    escape(segment, true)
}

fn escape(input: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
