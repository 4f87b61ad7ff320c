//! Reply templates. Each one is the literal fallback if paraphrasing degrades.

use crate::extraction::Extraction;
use crate::policy::PRICE;

pub const WELCOME: &str = "Привіт! Я твій помічник зі страхування авто. Я допоможу тобі оформити страховий поліс. Надішли фото свого паспорта для початку.";

/// Sent verbatim, never paraphrased.
pub const USE_START: &str = "Для початку введіть /start";

pub const ASK_VEHICLE_DOC: &str =
    "Дякую за фото паспорта. Тепер надішли фото технічного паспорта автомобіля.";

pub const INVALID_IDENTITY_PHOTO: &str = "Надішли коректне фото паспорта.";

pub const INVALID_VEHICLE_PHOTO: &str = "Надішли коректне фото технічного паспорта.";

pub const RESEND_BOTH: &str = "Надішли ще раз фото паспорта та технічного паспорта.";

pub const ANSWER_YES_NO: &str = "Відповідай 'Так' або 'Ні'.";

pub const POLICY_ISSUED: &str = "Вітаю! Твій поліс оформлено та надіслано. Дякую за покупку!";

pub const EXTRACTION_FAILED: &str =
    "Не вдалося обробити документи. Спробуй надіслати фото технічного паспорта ще раз.";

pub fn price_quote() -> String {
    format!("Вартість поліса — {PRICE}. Згоден? {ANSWER_YES_NO}")
}

pub fn price_is_fixed() -> String {
    format!("Вибач, але {PRICE} — єдина ціна. Продовжуємо? {ANSWER_YES_NO}")
}

/// Summary of the extracted fields followed by the yes/no question.
/// Simulated data is marked in the heading.
pub fn confirmation_summary(extraction: &Extraction) -> String {
    let heading = if extraction.is_simulated() {
        "Підтвердь дані (симуляція через помилку API):"
    } else {
        "Підтвердь дані:"
    };

    let mut text = format!("{heading}\n");
    for (label, value) in extraction.record.labelled_fields() {
        text.push_str(&format!("{label}: {value}\n"));
    }
    text.push('\n');
    text.push_str(ANSWER_YES_NO);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractedRecord, RecordSource};

    #[test]
    fn summary_lists_six_fields() {
        let extraction = Extraction {
            record: ExtractedRecord::fallback(),
            source: RecordSource::Extracted,
        };
        let summary = confirmation_summary(&extraction);
        assert_eq!(
            summary,
            "Підтвердь дані:\n\
             Ім'я: Константин Константинопольский\n\
             Номер паспорта: АА111111\n\
             VIN авто: A1231A123A123A123\n\
             Номерний знак: АА 1111 АА\n\
             Марка авто: Audi A6\n\
             Рік випуску: 2016\n\
             \n\
             Відповідай 'Так' або 'Ні'."
        );
    }

    #[test]
    fn simulated_summary_is_marked() {
        let extraction = Extraction {
            record: ExtractedRecord::fallback(),
            source: RecordSource::Simulated,
        };
        assert!(
            confirmation_summary(&extraction)
                .starts_with("Підтвердь дані (симуляція через помилку API):\n")
        );
    }

    #[test]
    fn price_prompts_mention_fixed_price() {
        assert_eq!(
            price_quote(),
            "Вартість поліса — 100 USD. Згоден? Відповідай 'Так' або 'Ні'."
        );
        assert_eq!(
            price_is_fixed(),
            "Вибач, але 100 USD — єдина ціна. Продовжуємо? Відповідай 'Так' або 'Ні'."
        );
    }
}
