use std::collections::BTreeMap;

/// Name of the hidden field carrying the server-issued view-state token.
pub const VIEW_STATE_FIELD: &str = "javax.faces.ViewState";

/// Server-side session continuity for one scrape: the view-state token, the
/// owning form and every tracked form field.
///
/// Cascade fields are the dependent dropdown inputs, upstream first. Setting
/// one of them clears every field after it, because the server repopulates
/// the downstream dropdowns and any earlier choice there is no longer valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    view_state: String,
    form_id: String,
    fields: BTreeMap<String, String>,
    cascade: Vec<String>,
}

impl SessionState {
    pub fn new(view_state: impl Into<String>, form_id: impl Into<String>) -> Self {
        Self {
            view_state: view_state.into(),
            form_id: form_id.into(),
            ..Self::default()
        }
    }

    /// Declare the dependent dropdown chain, upstream first.
    pub fn with_cascade<I, S>(mut self, cascade: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cascade = cascade.into_iter().map(Into::into).collect();
        self
    }

    /// Seed fields that are not part of the cascade (fixed filters).
    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in fields {
            self.fields.insert(name.into(), value.into());
        }
        self
    }

    pub fn view_state(&self) -> &str {
        &self.view_state
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn cascade(&self) -> &[String] {
        &self.cascade
    }

    /// Replace the view-state token. Empty tokens are ignored so a blank
    /// update element can never wipe a valid token.
    pub fn apply_view_state(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() {
            self.view_state = token;
        }
    }

    /// Set a field value. For a cascade field every downstream cascade field
    /// is cleared.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(pos) = self.cascade.iter().position(|f| *f == name) {
            for downstream in &self.cascade[pos + 1..] {
                self.fields.remove(downstream);
            }
        }
        self.fields.insert(name, value.into());
    }

    /// Fields as the browser submits them: every set value, plus an empty
    /// `_focus` companion for each `_input` field and each cascade field,
    /// set or not.
    pub fn submission_fields(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut focus: Vec<String> = self
            .fields
            .keys()
            .chain(self.cascade.iter())
            .filter_map(|name| focus_field_name(name))
            .collect();
        focus.sort();
        focus.dedup();
        out.extend(focus.into_iter().map(|name| (name, String::new())));
        out
    }
}

/// `yaxisVar_input` -> `yaxisVar_focus`; `None` for names without the suffix.
pub fn focus_field_name(input_name: &str) -> Option<String> {
    input_name
        .strip_suffix("_input")
        .map(|base| format!("{base}_focus"))
}
