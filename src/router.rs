//! Path-template routing.
//!
//! Templates are literal paths with `{name}` placeholders, e.g.
//! `/users/{id}/posts/{post_id}`. Each placeholder matches one or more
//! characters from `[A-Za-z0-9_-]`, and the template must match the whole
//! request path. Routes are tried in the order they were added; the first
//! match wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::handler::{Handler, PathParams, SharedHandler};

const PLACEHOLDER_MATCH: &str = "([A-Za-z0-9_-]+)";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z0-9_-]+)\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route {0:?} is already registered")]
    Duplicate(String),
    #[error("invalid route template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("no route matches {0:?}")]
    NotFound(String),
}

/// A compiled path template paired with its handler.
pub struct Route {
    template: String,
    pattern: Regex,
    param_names: Vec<String>,
    handler: SharedHandler,
}

impl Route {
    pub fn new(template: &str, handler: SharedHandler) -> Result<Self, RouteError> {
        let (pattern, param_names) = compile_template(template)?;
        Ok(Self {
            template: template.to_string(),
            pattern,
            param_names,
            handler,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns the captured parameters if `path` matches the whole template.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let captures = self.pattern.captures(path)?;
        Some(
            self.param_names
                .iter()
                .zip(captures.iter().skip(1))
                .filter_map(|(name, value)| Some((name.clone(), value?.as_str().to_string())))
                .collect(),
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.template)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Turns `/welcome/{name}` into `^/welcome/([A-Za-z0-9_-]+)$` plus the list of
/// placeholder names in capture order.
fn compile_template(template: &str) -> Result<(Regex, Vec<String>), RouteError> {
    let invalid = |reason: String| RouteError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut source = String::from("^");
    let mut param_names: Vec<String> = Vec::new();
    let mut literal_start = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if param_names.iter().any(|existing| existing == name) {
            return Err(invalid(format!("placeholder {{{name}}} appears twice")));
        }

        source.push_str(&regex::escape(&template[literal_start..whole.start()]));
        source.push_str(PLACEHOLDER_MATCH);
        param_names.push(name.to_string());
        literal_start = whole.end();
    }
    source.push_str(&regex::escape(&template[literal_start..]));
    source.push('$');

    let pattern = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
    Ok((pattern, param_names))
}

/// Ordered collection of routes.
///
/// Built once at startup, then shared read-only by every connection.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `template`.
    ///
    /// # Errors
    ///
    /// [`RouteError::Duplicate`] if the exact same template string was already
    /// registered, [`RouteError::InvalidTemplate`] if it cannot be compiled.
    pub fn add_route<H: Handler>(&mut self, template: &str, handler: H) -> Result<(), RouteError> {
        self.add_shared(template, std::sync::Arc::new(handler))
    }

    /// Registers routes in iteration order, stopping at the first error.
    ///
    /// ```
    /// # use sparrow::{Router, Request, PathParams, handler_fn};
    /// async fn home(_: Request, _: PathParams) -> anyhow::Result<&'static str> { Ok("home") }
    /// async fn about(_: Request, _: PathParams) -> anyhow::Result<&'static str> { Ok("about") }
    ///
    /// let mut router = Router::new();
    /// router.add_routes([("/", handler_fn(home)), ("/about", handler_fn(about))]).unwrap();
    /// assert_eq!(router.templates().collect::<Vec<_>>(), ["/", "/about"]);
    /// ```
    pub fn add_routes<I, S>(&mut self, routes: I) -> Result<(), RouteError>
    where
        I: IntoIterator<Item = (S, SharedHandler)>,
        S: AsRef<str>,
    {
        for (template, handler) in routes {
            self.add_shared(template.as_ref(), handler)?;
        }
        Ok(())
    }

    fn add_shared(&mut self, template: &str, handler: SharedHandler) -> Result<(), RouteError> {
        if self.routes.iter().any(|route| route.template == template) {
            return Err(RouteError::Duplicate(template.to_string()));
        }

        let route = Route::new(template, handler)?;
        tracing::debug!(template, pattern = route.pattern.as_str(), "route registered");
        self.routes.push(route);
        Ok(())
    }

    /// Finds the first route whose template matches all of `path`.
    ///
    /// # Errors
    ///
    /// [`RouteError::NotFound`] if no route matches.
    pub fn get_handler(&self, path: &str) -> Result<(SharedHandler, PathParams), RouteError> {
        self.routes
            .iter()
            .find_map(|route| {
                route
                    .matches(path)
                    .map(|params| (std::sync::Arc::clone(&route.handler), params))
            })
            .ok_or_else(|| RouteError::NotFound(path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered templates in match order.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::template)
    }
}
