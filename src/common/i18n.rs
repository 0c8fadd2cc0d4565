// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "de";

// (key, de, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("error.validation", "Ein oder mehrere Felder sind ungültig.", "One or more fields are invalid."),
    ("error.unauthorized", "Nicht angemeldet.", "Not signed in."),
    ("error.invalid_token", "Authentifizierungstoken ungültig oder fehlend.", "Authentication token is invalid or missing."),
    ("error.invalid_credentials", "E-Mail oder Passwort ungültig.", "Invalid e-mail or password."),
    ("error.forbidden", "Keine Berechtigung für diese Aktion.", "You are not allowed to perform this action."),
    ("error.not_found", "{entity} nicht gefunden.", "{entity} not found."),
    ("error.email_exists", "Diese E-Mail-Adresse wird bereits verwendet.", "This e-mail address is already in use."),
    ("error.invalid_reference", "Verweis ungültig: {field}.", "Invalid reference: {field}."),
    ("error.internal", "Ein unerwarteter Fehler ist aufgetreten.", "An unexpected error occurred."),
    ("validation.required", "Pflichtfeld", "required"),
    ("validation.invalid_email", "Ungültige E-Mail-Adresse", "invalid e-mail address"),
    ("validation.password_too_short", "Passwort zu kurz (mind. 8 Zeichen)", "password too short (min. 8 characters)"),
    ("validation.too_long", "Zu lang", "too long"),
    ("validation.invalid_country_code", "Ländercode muss 2 Zeichen haben", "country code must have 2 characters"),
    ("validation.invalid_postal_code", "Ungültige Postleitzahl", "invalid postal code"),
    ("validation.invalid_locale", "Ungültige Sprache", "invalid locale"),
    ("validation.out_of_range", "Wert außerhalb des erlaubten Bereichs", "value out of range"),
    ("validation.invalid_role", "Rolle für diesen Benutzertyp nicht zulässig", "role not allowed for this user type"),
    ("validation.nested_subtask", "Unteraufgaben können nicht verschachtelt werden", "subtasks cannot be nested"),
    ("entity.customer", "Kunde", "Customer"),
    ("entity.address", "Adresse", "Address"),
    ("entity.contact", "Kontakt", "Contact"),
    ("entity.project", "Projekt", "Project"),
    ("entity.task", "Aufgabe", "Task"),
    ("entity.ticket", "Ticket", "Ticket"),
    ("entity.comment", "Kommentar", "Comment"),
    ("entity.user", "Benutzer", "User"),
    ("entity.notification", "Benachrichtigung", "Notification"),
];

/// Message catalogue for API error bodies.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalog: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nStore {
    pub fn new() -> Self {
        let mut catalog: HashMap<&'static str, HashMap<&'static str, &'static str>> = HashMap::new();
        for (key, de, en) in MESSAGES {
            catalog.entry("de").or_default().insert(key, de);
            catalog.entry("en").or_default().insert(key, en);
        }
        Self { catalog }
    }

    /// Looks up `key` for `lang`, falling back to German, then to the key itself.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.catalog
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.catalog.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn translate_with(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.translate(lang, key), |msg, (name, value)| {
            msg.replace(&format!("{{{name}}}"), value)
        })
    }
}
