use scraper::{ElementRef, Html, Selector};
use vahan_core::{Axis, SelectOption, VIEW_STATE_FIELD};

use crate::types::ProtocolError;

/// What bootstrap needs from the initial page. Everything is extracted
/// eagerly so no parsed DOM outlives this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPage {
    pub view_state: String,
    pub form_id: String,
    pub html: String,
}

/// Locate the view-state token and the owning form.
///
/// The form is the one containing the view-state input; failing that, the
/// first form that carries an id.
pub fn parse_bootstrap(html: &str) -> Result<BootstrapPage, ProtocolError> {
    let doc = Html::parse_document(html);

    let input_sel = Selector::parse(&format!("input[name='{VIEW_STATE_FIELD}']")).ok();
    let view_state_input = input_sel.as_ref().and_then(|sel| doc.select(sel).next());
    let view_state = view_state_input
        .and_then(|input| input.value().attr("value"))
        .filter(|v| !v.is_empty())
        .ok_or(ProtocolError::MissingViewState)?
        .to_string();

    let owning_form = view_state_input.and_then(|input| {
        input
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "form")
            .and_then(|form| form.value().attr("id"))
            .filter(|id| !id.is_empty())
    });
    let form_sel = Selector::parse("form[id]").ok();
    let form_id = owning_form
        .or_else(|| {
            form_sel
                .as_ref()
                .and_then(|sel| doc.select(sel).find_map(|f| f.value().attr("id")))
                .filter(|id| !id.is_empty())
        })
        .ok_or(ProtocolError::MissingForm)?
        .to_string();

    Ok(BootstrapPage {
        view_state,
        form_id,
        html: html.to_string(),
    })
}

/// Options of the `<select>` with the given id, in document order. Options
/// without a value are placeholders and are skipped.
pub fn select_options(html: &str, select_id: &str) -> Vec<SelectOption> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse(&format!("select[id='{select_id}'] option")) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|opt| {
            let value = opt.value().attr("value")?.trim();
            if value.is_empty() {
                return None;
            }
            let label = opt.text().collect::<String>().trim().to_string();
            Some(SelectOption::new(value, label))
        })
        .collect()
}

/// Drop entries that only prompt the user, such as a "Select Year" caption.
pub fn discard_placeholders(axis: Axis, options: Vec<SelectOption>) -> Vec<SelectOption> {
    match axis {
        Axis::Year => options
            .into_iter()
            .filter(|opt| !opt.label.contains("Select"))
            .collect(),
        Axis::YAxis | Axis::XAxis => options,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectSummary {
    pub id: String,
    pub option_count: usize,
    pub sample: Vec<SelectOption>,
}

/// Structural overview of a page, for diagnosing layout changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInventory {
    pub forms: Vec<String>,
    pub selects: Vec<SelectSummary>,
    pub hidden_inputs: Vec<String>,
}

pub fn inventory(html: &str, sample_size: usize) -> PageInventory {
    let doc = Html::parse_document(html);
    let mut inv = PageInventory::default();

    if let Ok(sel) = Selector::parse("form") {
        inv.forms = doc
            .select(&sel)
            .map(|f| f.value().attr("id").unwrap_or("<no id>").to_string())
            .collect();
    }

    if let (Ok(select_sel), Ok(option_sel)) = (Selector::parse("select"), Selector::parse("option"))
    {
        inv.selects = doc
            .select(&select_sel)
            .map(|select| {
                let options: Vec<SelectOption> = select
                    .select(&option_sel)
                    .map(|opt| {
                        SelectOption::new(
                            opt.value().attr("value").unwrap_or_default(),
                            opt.text().collect::<String>().trim(),
                        )
                    })
                    .collect();
                SelectSummary {
                    id: select.value().attr("id").unwrap_or("<no id>").to_string(),
                    option_count: options.len(),
                    sample: options.into_iter().take(sample_size).collect(),
                }
            })
            .collect();
    }

    if let Ok(sel) = Selector::parse("input[type='hidden']") {
        inv.hidden_inputs = doc
            .select(&sel)
            .filter_map(|input| input.value().attr("name"))
            .map(str::to_string)
            .collect();
    }

    inv
}
