//! Insurance policy synthesizer: fills the fixed policy template.
//!
//! Pure: the same record and issue date always render the same bytes.

use chrono::{Months, NaiveDate};

use crate::extraction::ExtractedRecord;

/// Policy number printed on every document.
pub const POLICY_NUMBER: &str = "111111111";
/// The only price on offer.
pub const PRICE: &str = "100 USD";
/// File name used when the policy is delivered.
pub const POLICY_FILE_NAME: &str = "InsurancePolicy.txt";

const DATE_FORMAT: &str = "%d.%m.%Y";

/// A rendered policy ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub file_name: String,
    pub text: String,
}

impl PolicyDocument {
    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

/// Last day of cover: one calendar year after issue (29 Feb clamps to 28 Feb).
pub fn expiry_date(issued_on: NaiveDate) -> NaiveDate {
    issued_on
        .checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX)
}

/// Render the policy for `record`, issued on `issued_on`.
pub fn synthesize(record: &ExtractedRecord, issued_on: NaiveDate) -> PolicyDocument {
    let start = issued_on.format(DATE_FORMAT).to_string();
    let end = expiry_date(issued_on).format(DATE_FORMAT).to_string();

    let text = format!(
        "Поліс №{POLICY_NUMBER}
обов'язкового страхування цивільно-правової відповідальності власників наземних транспортних засобів

Цей документ є візуальною формою полісу, що посвідчує укладення внутрішнього електронного договору
обов’язкового страхування цивільно-правової відповідальності власників наземних транспортних засобів.
Договір діє виключно на території України на умовах, встановлених Законом України «Про обов’язкове страхування цивільно-правової відповідальності власників наземних транспортних засобів».

Страховик
«Назва страхової компанії»
Адреса: Україна, м. Київ, вул. Хрещатик
Телефон: 0 800 000 000

Страхувальник
{name}
Адреса: Київ, Хрещатик, 1, 1
Дата народження: 01.01.1990
Паспорт: {passport}
Виданий: Дарницьким РУ ГУ МВС України в м. Києві, 01.01.2010

Строк дії Договору
З 00:00 {start} по {end} включно
Договір набирає чинності з початку строку його дії, але не раніше дати його реєстрації у єдиній централізованій базі даних.

Дата реєстрації Договору: 00:00 {start}

Страхова сума на одного
За шкоду, заподіяну життю і здоров'ю: двісті тисяч гривень 00 коп.
За шкоду, заподіяну майну: сто тисяч гривень 00 коп.

Розмір франшизи
Одна тисяча гривень 00 коп.

Забезпечений транспортний засіб
Марка: {make}
Тип: A2
Номерний знак: {plate}
VIN: {vin}
Рік випуску: {year}
Місце реєстрації: Київ

Особливі умови використання ТЗ:
ТЗ використовується як таксі/маршрутне таксі: НІ
ТЗ підлягає обов'язковому технічному контролю: НІ
До керування допущені особи з водійським стажем менше 3-х років: ТАК
ТЗ використовується протягом повного строку страхування

Коефіцієнти
БП: 180, К1: 0.68, К2: 4.8, К3: 1, К4: 1.7, К5: 1, К6: 1, К строк: 1, К бонус-малус: 0.89, К зменшувальний: 1

Страховий платіж
{PRICE}

Способи перевірки чинності:
- http://www.mtsbu.ua/, розділ «Перевірка чинності»
- Телефон МТСБУ: 0-800-608-800
- Електронний Європротокол: https://dtp.mtsbu.ua",
        name = record.name,
        passport = record.passport_number,
        make = record.vehicle_make,
        plate = record.license_plate,
        vin = record.vehicle_id,
        year = record.year,
    );

    PolicyDocument {
        file_name: POLICY_FILE_NAME.to_string(),
        text,
    }
}
