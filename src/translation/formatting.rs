/*!
 * Output formatting for translated fragments.
 *
 * In `Replace` mode the translation stands alone; in `Bilingual` mode the
 * original text is kept and the translation follows it in brackets.
 */

use crate::app_config::TranslationMode;

/// Text written back into the chapter for one fragment
pub fn format_translation(mode: TranslationMode, original: &str, translated: &str) -> String {
    match mode {
        TranslationMode::Replace => translated.to_string(),
        TranslationMode::Bilingual => format!("{} [{}]", original, translated),
    }
}
