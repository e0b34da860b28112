use serde::{Deserialize, Serialize};

use crate::Language;

/// One fragment of submitted source code.
///
/// Problems may ship a template whose locked fragments the submitter is not
/// allowed to edit; the lock has no effect on execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Snippet {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "print(input())")]
    pub text: String,
    #[serde(default)]
    pub locked: bool,
}

/// Starter code offered for one language of a problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub language: Language,
    pub code: Vec<Snippet>,
}

/// Source text handed to the judge: fragments joined by newlines, in submitted order.
pub fn flatten(code: &[Snippet]) -> String {
    code.iter()
        .map(|snippet| snippet.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check submitted fragments against the problem's template for `language`.
///
/// Without a template (or with an empty one) any code is accepted. Otherwise
/// the submission must contain exactly the template's fragment ids, and every
/// locked fragment must keep the template's text.
pub fn is_valid_code(code: &[Snippet], language: Language, templates: &[Template]) -> bool {
    let Some(template) = templates
        .iter()
        .find(|template| template.language == language)
        .map(|template| &template.code)
    else {
        return true;
    };
    if template.is_empty() {
        return true;
    }
    if template.len() != code.len() {
        return false;
    }

    let mut expected: Vec<&Snippet> = template.iter().collect();
    let mut actual: Vec<&Snippet> = code.iter().collect();
    expected.sort_by_key(|snippet| snippet.id);
    actual.sort_by_key(|snippet| snippet.id);

    expected.iter().zip(actual).all(|(expected, actual)| {
        expected.id == actual.id && (!expected.locked || expected.text == actual.text)
    })
}
