//! HTML for the browser routes, rendered from registered handlebars
//! templates. `{{...}}` escapes; only the rendered markdown uses `{{{...}}}`.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use serde_json::json;

use crate::pipeline::{encode_path_segment, IndexView, PageView};

const TEMPLATES: [(&str, &str); 4] = [
    ("index", include_str!("templates/index.hbs")),
    ("page", include_str!("templates/page.hbs")),
    ("login", include_str!("templates/login.hbs")),
    ("error", include_str!("templates/error.hbs")),
];

#[derive(Serialize)]
struct PageLink<'a> {
    name: &'a str,
    href: String,
}

pub struct Views {
    handlebars: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_partial("header", include_str!("templates/header.hbs"))?;
        handlebars.register_partial("footer", include_str!("templates/footer.hbs"))?;
        for (name, source) in TEMPLATES {
            handlebars.register_template_string(name, source)?;
        }
        Ok(Self { handlebars })
    }

    pub fn index(&self, view: &IndexView) -> Result<String, RenderError> {
        let pages: Vec<PageLink> = view
            .pages
            .iter()
            .map(|name| PageLink {
                name,
                href: encode_path_segment(name),
            })
            .collect();

        self.handlebars.render(
            "index",
            &json!({
                "title": view.title,
                "username": view.username,
                "pages": pages,
                "canCreatePage": view.can_create_page,
                "backupGistUrl": view.backup_url,
            }),
        )
    }

    pub fn page(&self, view: &PageView) -> Result<String, RenderError> {
        self.handlebars.render("page", view)
    }

    pub fn login(&self, error: Option<&str>) -> Result<String, RenderError> {
        self.handlebars
            .render("login", &json!({ "title": "Login", "error": error }))
    }

    pub fn error(&self, status: u16, message: &str) -> Result<String, RenderError> {
        self.handlebars.render(
            "error",
            &json!({ "title": "Error", "status": status, "message": message }),
        )
    }
}
