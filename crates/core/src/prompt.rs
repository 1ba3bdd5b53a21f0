/// One row of a batch as sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub id: usize,
    pub text: String,
}

/// Fixed instruction plus one `ID:<id> | <label>:<text>` line per item.
///
/// The instruction must spell out the answer grammar the response parser
/// expects; the model has no other way to learn it.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub instruction: String,
    pub item_label: String,
    pub list_heading: String,
}

impl PromptTemplate {
    pub fn encode(&self, items: &[BatchItem]) -> String {
        let mut prompt = String::new();
        prompt.push_str(self.instruction.trim());
        prompt.push_str("\n\n");
        prompt.push_str(self.list_heading.trim());
        prompt.push('\n');
        for item in items {
            prompt.push_str(&format!(
                "ID:{} | {}:{}\n",
                item.id,
                self.item_label,
                single_line(&item.text)
            ));
        }
        prompt
    }
}

/// Item text must not break the one-line-per-item contract.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> PromptTemplate {
        PromptTemplate {
            instruction: "Antwoord per regel: ID:<ID> | rol:<Wel/Niet>".to_string(),
            item_label: "Ingr".to_string(),
            list_heading: "Lijst:".to_string(),
        }
    }

    fn items() -> Vec<BatchItem> {
        vec![
            BatchItem { id: 4, text: "kikkererwten".into() },
            BatchItem { id: 9, text: "wei\neiwit  poeder".into() },
        ]
    }

    #[test]
    fn encodes_one_line_per_item_after_instruction() {
        let prompt = template().encode(&items());
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "Antwoord per regel: ID:<ID> | rol:<Wel/Niet>");
        assert_eq!(lines[2], "Lijst:");
        assert_eq!(lines[3], "ID:4 | Ingr:kikkererwten");
        assert_eq!(lines[4], "ID:9 | Ingr:wei eiwit poeder");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(template().encode(&items()), template().encode(&items()));
    }
}
