//! Lightweight structural scans of generated artifacts.
//!
//! These are not parsers. They recover the `(method, path)` pairs a main
//! artifact registers and the endpoint headings a documentation artifact
//! lists, which is enough to tell whether a revised artifact still exposes
//! exactly the endpoints of its specification.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::spec::{ApiSpec, Framework, HttpMethod};

/// A `(method, path)` pair with the path in `{param}` form.
pub type Route = (HttpMethod, String);

/// `@app.get("/p")`, FastAPI and the Flask shortcut decorators.
static DECORATOR_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@app\.(get|post|put|patch|delete)\(\s*(?:path\s*=\s*)?["']([^"']+)["']"#)
        .expect("decorator route regex must compile")
});

/// `@app.route("/p/<x>", methods=["GET", "POST"])`
static FLASK_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@app\.route\(\s*["']([^"']+)["']([^)]*)\)"#)
        .expect("flask route regex must compile")
});

static FLASK_METHODS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"methods\s*=\s*[\[(]([^\])]*)[\])]"#).expect("flask methods regex must compile")
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([A-Za-z]+)["']"#).expect("quoted word regex must compile"));

/// `app.get('/p/:x', ...)`
static EXPRESS_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bapp\.(get|post|put|patch|delete)\(\s*["'`]([^"'`]+)["'`]"#)
        .expect("express route regex must compile")
});

/// Route registration outside the decorator and `app.<verb>` forms above:
/// routers, blueprints, mounts, catch-all verbs and imperative registration.
static FOREIGN_ROUTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\.(?:api_route|add_api_route|add_api_websocket_route|add_route|add_websocket_route",
        r"|websocket|websocket_route|include_router|mount|register_blueprint|add_url_rule)\s*\(",
        r"|\b(?:APIRouter|Blueprint|Router)\s*\(",
        r"|\bapp\.(?:all|head|options|trace)\s*\(",
        r#"|\bapp\.use\s*\(\s*["'`/]"#,
    ))
    .expect("foreign routing regex must compile")
});

/// `app.route(...)`, which only Flask registers through a recognised form.
static APP_ROUTE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bapp\.route\s*\(").expect("app.route regex must compile"));

/// `### GET /path` documentation headings.
static DOC_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^###[ \t]+([A-Za-z]+)[ \t]+(/\S*)[ \t]*$").expect("heading regex must compile")
});

/// Routes registered by a main artifact, in source order.
///
/// Comment lines are ignored. Paths are normalised back to `{param}` form.
pub fn declared_routes(framework: Framework, source: &str) -> Vec<Route> {
    let code = strip_comment_lines(source);
    let mut found: Vec<(usize, HttpMethod, String)> = Vec::new();

    match framework {
        Framework::FastApi | Framework::Flask => {
            for caps in DECORATOR_ROUTE.captures_iter(&code) {
                if let (Some(whole), Ok(method)) = (caps.get(0), caps[1].parse::<HttpMethod>()) {
                    found.push((whole.start(), method, normalize_path(framework, &caps[2])));
                }
            }
        }
        Framework::Express => {
            for caps in EXPRESS_ROUTE.captures_iter(&code) {
                if let (Some(whole), Ok(method)) = (caps.get(0), caps[1].parse::<HttpMethod>()) {
                    found.push((whole.start(), method, normalize_path(framework, &caps[2])));
                }
            }
        }
    }

    if framework == Framework::Flask {
        for caps in FLASK_ROUTE.captures_iter(&code) {
            let Some(whole) = caps.get(0) else { continue };
            let path = normalize_path(framework, &caps[1]);
            for method in flask_methods(&caps[2]) {
                found.push((whole.start(), method, path.clone()));
            }
        }
    }

    found.sort_by_key(|(pos, _, _)| *pos);
    found
        .into_iter()
        .map(|(_, method, path)| (method, path))
        .collect()
}

/// Unrecognised verbs are dropped; no `methods=` means GET.
fn flask_methods(args: &str) -> Vec<HttpMethod> {
    match FLASK_METHODS.captures(args) {
        Some(list) => QUOTED
            .captures_iter(&list[1])
            .filter_map(|m| m[1].parse().ok())
            .collect(),
        None => vec![HttpMethod::Get],
    }
}

/// `<int:id>` / `:id` / `{id:path}` -> `{id}`
pub fn normalize_path(framework: Framework, path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let name = match framework {
                Framework::Flask => segment
                    .strip_prefix('<')
                    .and_then(|s| s.strip_suffix('>'))
                    .map(|inner| inner.rsplit(':').next().unwrap_or(inner)),
                Framework::Express => segment
                    .strip_prefix(':')
                    .map(|s| s.trim_end_matches('?')),
                Framework::FastApi => None,
            }
            .or_else(|| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map(|inner| inner.split(':').next().unwrap_or(inner))
            });
            match name {
                Some(name) => format!("{{{name}}}"),
                None => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_comment_lines(source: &str) -> String {
    source
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with('#') || trimmed.starts_with("//") || trimmed.starts_with('*'))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The spec's endpoints as routes, in declaration order.
pub fn spec_routes(spec: &ApiSpec) -> Vec<Route> {
    spec.endpoints
        .iter()
        .map(|e| (e.method, e.path.clone()))
        .collect()
}

/// Whether `source` may register routes that [`declared_routes`] cannot see.
///
/// Comment lines are ignored.
pub fn has_unrecognised_routing(framework: Framework, source: &str) -> bool {
    let code = strip_comment_lines(source);
    FOREIGN_ROUTING.is_match(&code)
        || (framework != Framework::Flask && APP_ROUTE_CALL.is_match(&code))
}

/// `/users/{user_id}` -> `/users/{}`
///
/// Generated handlers may rename a placeholder to keep it a valid
/// identifier; the route is still the same endpoint.
pub fn route_shape((method, path): &Route) -> Route {
    let shape = path
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    (*method, shape)
}

/// Whether `source` registers exactly the spec's endpoints (order-insensitive,
/// duplicates count) and nothing through a form the scan cannot read.
pub fn main_matches_spec(spec: &ApiSpec, source: &str) -> bool {
    if has_unrecognised_routing(spec.framework, source) {
        return false;
    }
    let mut declared: Vec<Route> = declared_routes(spec.framework, source)
        .iter()
        .map(route_shape)
        .collect();
    let mut expected: Vec<Route> = spec_routes(spec).iter().map(route_shape).collect();
    declared.sort();
    expected.sort();
    declared == expected
}

/// `### METHOD /path` headings, in document order.
pub fn documented_endpoints(markdown: &str) -> Vec<Route> {
    DOC_HEADING
        .captures_iter(markdown)
        .filter_map(|caps| {
            let method = caps[1].parse::<HttpMethod>().ok()?;
            Some((method, caps[2].to_string()))
        })
        .collect()
}

/// Whether the documentation lists every endpoint heading, in spec order, and nothing else.
pub fn documentation_matches_spec(spec: &ApiSpec, markdown: &str) -> bool {
    documented_endpoints(markdown) == spec_routes(spec)
}
