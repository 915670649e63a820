use tracing::debug;

use crate::session::Session;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const FORM_LIBRARY_PATH: &str = "/form-library";
pub const ADMIN_LOGIN_PATH: &str = "/admin-login";
pub const ADMIN_PATH: &str = "/admin";

pub const DEFAULT_TOPIC: &str = "General Service";
pub const CUSTOM_FORM_PREFIX: &str = "custom-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    FormLibrary,
    Survey { topic: String },
    /// `form_id` keeps its `custom-` prefix; it is the registry key.
    CustomSurvey { form_id: String },
    AdminLogin,
    Admin,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    View(Route),
    Redirect(&'static str),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.trim().trim_start_matches('#');
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Root,
            ["login"] => Route::Login,
            ["form-library"] => Route::FormLibrary,
            ["admin-login"] => Route::AdminLogin,
            ["admin"] => Route::Admin,
            ["survey", segment] if segment.starts_with(CUSTOM_FORM_PREFIX) => Route::CustomSurvey {
                form_id: decode_segment(segment),
            },
            ["survey", segment] => {
                let topic = decode_segment(segment);
                Route::Survey {
                    topic: if topic.is_empty() {
                        DEFAULT_TOPIC.to_string()
                    } else {
                        topic
                    },
                }
            }
            _ => Route::Unmatched,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => ROOT_PATH.to_string(),
            Route::Login => LOGIN_PATH.to_string(),
            Route::FormLibrary => FORM_LIBRARY_PATH.to_string(),
            Route::Survey { topic } => survey_path(topic),
            Route::CustomSurvey { form_id } => format!("/survey/{}", urlencoding::encode(form_id)),
            Route::AdminLogin => ADMIN_LOGIN_PATH.to_string(),
            Route::Admin => ADMIN_PATH.to_string(),
            Route::Unmatched => FORM_LIBRARY_PATH.to_string(),
        }
    }
}

/// Applies the access gates to a parsed route.
pub fn resolve(route: Route, session: &Session) -> Resolution {
    let resolution = match route {
        Route::Root => Resolution::Redirect(LOGIN_PATH),
        Route::FormLibrary if !session.can_browse() => Resolution::Redirect(LOGIN_PATH),
        Route::Admin if !session.is_admin() => Resolution::Redirect(ADMIN_LOGIN_PATH),
        Route::Unmatched => Resolution::Redirect(FORM_LIBRARY_PATH),
        route => Resolution::View(route),
    };
    debug!(?resolution, "route resolved");
    resolution
}

pub fn resolve_path(path: &str, session: &Session) -> Resolution {
    resolve(Route::parse(path), session)
}

pub fn survey_path(topic: &str) -> String {
    format!("/survey/{}", urlencoding::encode(topic))
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
