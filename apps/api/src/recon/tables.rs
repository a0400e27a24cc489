//! Fixed table vocabulary shared by the CSV grouping step and the sheet
//! assembly step. Kept in one place so the two cannot drift apart.

/// Column that marks the newer flat export format: each row names its logical
/// source table instead of the data being split across eight tables.
pub const FLAT_MARKER_COLUMN: &str = "Nome_Tabella";

/// Column carrying the table identifier in legacy semicolon-CSV exports.
pub const TABLE_ID_COLUMN: &str = "Tipo_Tabella";

/// Property marking the legacy eight-table JSON schema.
pub const LEGACY_MARKER_KEY: &str = "tabella_1_normativa_generale";

/// The legacy eight-table schema in assembly order: (identifier, display name).
pub const LEGACY_TABLES: [(&str, &str); 8] = [
    ("tabella_1_normativa_generale", "Normativa Generale"),
    ("tabella_2_normativa_nazionale_regionale", "Normativa Naz-Reg"),
    ("tabella_3_normativa_specifica_profilo", "Normativa Specifica"),
    ("tabella_4_competenze_tecnico_specialistiche", "Competenze Tecnico-Spec"),
    ("tabella_5_competenze_gestionali_procedurali", "Competenze Gestionali"),
    ("tabella_6_competenze_trasversali", "Competenze Trasversali"),
    ("tabella_7_competenze_informatiche", "Competenze Informatiche"),
    ("tabella_8_competenze_linguistiche", "Competenze Linguistiche"),
];

/// Optional summary objects attached to the legacy schema.
pub const SUMMARY_KEYS: [&str; 2] = ["sintesi_esecutiva", "raccomandazioni_operative"];
