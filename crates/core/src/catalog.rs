//! Sheet layout and the two classification stages run against it.

use crate::classify::ClassificationPlan;
use crate::error::Result;
use crate::parse::{FieldSpec, KeywordVocabulary, ResponseSchema};
use crate::prompt::PromptTemplate;

pub const MASTER_SHEET: &str = "Ingredienten Database";
pub const PRODUCTS_SHEET: &str = "Producten Input";

pub const INGREDIENT: &str = "Ingredient";
pub const PROTEIN_ROLE: &str = "Eiweet rol";
pub const ORIGIN: &str = "Classificatie";
pub const ORIGIN_DATE: &str = "Classificatie datum";
pub const SOURCE_PRODUCT: &str = "Bron product";

pub const PRODUCT_NAME: &str = "Productnaam";
pub const VENDOR: &str = "Supermarkt";
pub const INGREDIENTS: &str = "Ingredienten";
pub const INGREDIENTS_CLEAN: &str = "Ingredients clean";
pub const VENDOR_LABEL: &str = "Eiweetgroep Supermarkt";
pub const VENDOR_LABEL_STANDARD: &str = "Gestandaardiseerd supermarkt label";
pub const FIRST_PASS: &str = "First pass AI";
pub const FIRST_PASS_RATIONALE: &str = "AI rationale";
pub const FIRST_PASS_RAW: &str = "AI first pass antwoord";
pub const FIRST_PASS_DATE: &str = "First pass AI datum";
pub const REVIEW_NEEDED: &str = "Review nodig";
pub const INGREDIENT_GROUP: &str = "Ingredienten gebaseerde eiweet groep";
pub const PROTEIN_SOURCES: &str = "Eiwitbronnen";
pub const INGREDIENT_RATIONALE: &str = "AI ingredientrationale";
pub const MANUAL_REVIEW: &str = "Handmatige review nodig";

pub const UNKNOWN: &str = "Onbekend";

pub const DEFAULT_MASTER_BATCH: usize = 30;
pub const DEFAULT_PRODUCT_BATCH: usize = 20;
pub const DEFAULT_RATIONALE_LABELS: [&str; 2] = ["ingredientrationale", "rationale"];

const MASTER_INSTRUCTION: &str = "\
Bepaal voor elk ingrediënt:
1. Is het een bron van eiwit? (Antwoord: Wel of Niet)
2. Wat is de oorsprong? (Antwoord: Plantaardig of Dierlijk of Niet relevant)

Antwoord STRIKT met één regel per ingrediënt in dit formaat:
ID:<ID> | rol:<Wel/Niet> | type:<Plantaardig/Dierlijk/Niet relevant>";

const PRODUCT_INSTRUCTION: &str = "\
Je bent een senior voedingsmiddelenexpert gespecialiseerd in eiwitbronnen.
Classificeer de volgende producten strikt als 'Plantaardig', 'Dierlijk' of 'Combinatie'.
Geef per product één korte zin uitleg (rationale).

Antwoord ALLEEN in dit exacte formaat, zonder extra tekst:

ID:<ID> | oordeel:<Plantaardig/Dierlijk/Combinatie> | rationale:<korte uitleg>

Voorbeeld:
ID:123 | oordeel:Plantaardig | rationale:Gemaakt van sojabonen, volledig plantaardig.

Geef voor elke regel in de lijst hieronder precies één regel output in hetzelfde formaat.";

/// `wel` is checked before `niet`.
pub fn role_vocabulary() -> KeywordVocabulary {
    KeywordVocabulary::new([("wel", "Wel"), ("niet", "Niet")])
}

/// `plantaardig` wins over `dierlijk`, and both win over `relevant`.
pub fn origin_vocabulary() -> KeywordVocabulary {
    KeywordVocabulary::new([
        ("plantaardig", "Plantaardig"),
        ("dierlijk", "Dierlijk"),
        ("relevant", "Niet relevant"),
    ])
}

/// `combi` is checked first so "combinatie van plantaardig en dierlijk"
/// stays a combination.
pub fn verdict_vocabulary() -> KeywordVocabulary {
    KeywordVocabulary::new([
        ("combi", "Combinatie"),
        ("plantaardig", "Plantaardig"),
        ("dierlijk", "Dierlijk"),
    ])
}

impl ClassificationPlan {
    /// Protein role and origin for every master-list ingredient.
    pub fn ingredient_master() -> Result<Self> {
        let origin = origin_vocabulary();
        let valid_labels = origin.labels();
        let schema = ResponseSchema::new(vec![
            FieldSpec::new(PROTEIN_ROLE, &["rol", "role"], role_vocabulary())?,
            FieldSpec::new(ORIGIN, &["type", "oorsprong", "origin"], origin)?,
        ])
        .with_id_marker("id", false)?
        .with_echo_labels(&["Ingr"])?;
        Ok(Self {
            name: "ingredients".to_string(),
            input_column: INGREDIENT.to_string(),
            target_column: ORIGIN.to_string(),
            valid_labels,
            template: PromptTemplate {
                instruction: MASTER_INSTRUCTION.to_string(),
                item_label: "Ingr".to_string(),
                list_heading: "Lijst:".to_string(),
            },
            schema,
            timestamp_column: ORIGIN_DATE.to_string(),
            batch_size: DEFAULT_MASTER_BATCH,
        })
    }

    /// First-pass protein verdict with a one-line rationale per product.
    pub fn product_first_pass<S: AsRef<str>>(rationale_labels: &[S]) -> Result<Self> {
        let verdict = verdict_vocabulary();
        let valid_labels = verdict.labels();
        let schema = ResponseSchema::new(vec![FieldSpec::new(
            FIRST_PASS,
            &["oordeel", "verdict"],
            verdict,
        )?])
        .with_id_marker("id", true)?
        .with_rationale(FIRST_PASS_RATIONALE, rationale_labels)?
        .with_raw_column(FIRST_PASS_RAW)
        .with_echo_labels(&["Product"])?;
        Ok(Self {
            name: "products".to_string(),
            input_column: PRODUCT_NAME.to_string(),
            target_column: FIRST_PASS.to_string(),
            valid_labels,
            template: PromptTemplate {
                instruction: PRODUCT_INSTRUCTION.to_string(),
                item_label: "Product".to_string(),
                list_heading: "Producten:".to_string(),
            },
            schema,
            timestamp_column: FIRST_PASS_DATE.to_string(),
            batch_size: DEFAULT_PRODUCT_BATCH,
        })
    }
}
