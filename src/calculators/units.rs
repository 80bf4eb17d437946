//! Unit conversion inside one category. Linear units carry a factor to the base unit of their
//! category (meter, kilogram, square meter, cubic meter, meter per second, pascal, joule, byte).
//! Temperatures are converted through Celsius.

use std::fmt::Display;

use anyhow::{bail, Result};
use clap::ValueEnum;

use crate::error::DaybookError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scale {
    Factor(f64),
    Temperature,
}

#[derive(Debug, PartialEq)]
pub struct Unit {
    pub symbol: &'static str,
    pub name: &'static str,
    scale: Scale,
}

const fn linear(symbol: &'static str, name: &'static str, factor: f64) -> Unit {
    Unit {
        symbol,
        name,
        scale: Scale::Factor(factor),
    }
}

const fn temperature(symbol: &'static str, name: &'static str) -> Unit {
    Unit {
        symbol,
        name,
        scale: Scale::Temperature,
    }
}

const LENGTH: &[Unit] = &[
    linear("mm", "Millimeter", 0.001),
    linear("cm", "Centimeter", 0.01),
    linear("m", "Meter", 1.0),
    linear("km", "Kilometer", 1000.0),
    linear("in", "Inch", 0.0254),
    linear("ft", "Foot", 0.3048),
    linear("yd", "Yard", 0.9144),
    linear("mile", "Mile", 1609.34),
    linear("nmi", "Nautical Mile", 1852.0),
];

const WEIGHT: &[Unit] = &[
    linear("mg", "Milligram", 0.000001),
    linear("g", "Gram", 0.001),
    linear("kg", "Kilogram", 1.0),
    linear("oz", "Ounce", 0.0283495),
    linear("lb", "Pound", 0.453592),
    linear("stone", "Stone", 6.35029),
    linear("ton", "Metric Ton", 1000.0),
];

const TEMPERATURE: &[Unit] = &[
    temperature("celsius", "Celsius"),
    temperature("fahrenheit", "Fahrenheit"),
    temperature("kelvin", "Kelvin"),
    temperature("rankine", "Rankine"),
];

const AREA: &[Unit] = &[
    linear("mm2", "Square Millimeter", 0.000001),
    linear("cm2", "Square Centimeter", 0.0001),
    linear("m2", "Square Meter", 1.0),
    linear("km2", "Square Kilometer", 1_000_000.0),
    linear("in2", "Square Inch", 0.00064516),
    linear("ft2", "Square Foot", 0.092903),
    linear("yd2", "Square Yard", 0.836127),
    linear("acre", "Acre", 4046.86),
    linear("hectare", "Hectare", 10_000.0),
];

const VOLUME: &[Unit] = &[
    linear("ml", "Milliliter", 0.000001),
    linear("l", "Liter", 0.001),
    linear("m3", "Cubic Meter", 1.0),
    linear("in3", "Cubic Inch", 0.0000163871),
    linear("ft3", "Cubic Foot", 0.0283168),
    linear("gal_us", "US Gallon", 0.00378541),
    linear("gal_uk", "UK Gallon", 0.00454609),
    linear("qt", "Quart", 0.000946353),
    linear("pt", "Pint", 0.000473176),
    linear("cup", "Cup", 0.000236588),
    linear("fl_oz", "Fluid Ounce", 0.0000295735),
];

const SPEED: &[Unit] = &[
    linear("mps", "Meters per Second", 1.0),
    linear("kph", "Kilometers per Hour", 0.277778),
    linear("mph", "Miles per Hour", 0.44704),
    linear("fps", "Feet per Second", 0.3048),
    linear("knot", "Knot", 0.514444),
];

const PRESSURE: &[Unit] = &[
    linear("pa", "Pascal", 1.0),
    linear("kpa", "Kilopascal", 1000.0),
    linear("bar", "Bar", 100_000.0),
    linear("atm", "Atmosphere", 101_325.0),
    linear("psi", "Pounds per Square Inch", 6894.76),
    linear("mmhg", "Millimeters of Mercury", 133.322),
    linear("torr", "Torr", 133.322),
];

const ENERGY: &[Unit] = &[
    linear("j", "Joule", 1.0),
    linear("kj", "Kilojoule", 1000.0),
    linear("cal", "Calorie", 4.184),
    linear("kcal", "Kilocalorie", 4184.0),
    linear("btu", "British Thermal Unit", 1055.06),
    linear("kwh", "Kilowatt Hour", 3_600_000.0),
    linear("wh", "Watt Hour", 3600.0),
];

const DATA: &[Unit] = &[
    linear("b", "Byte", 1.0),
    linear("kb", "Kilobyte", 1024.0),
    linear("mb", "Megabyte", 1_048_576.0),
    linear("gb", "Gigabyte", 1_073_741_824.0),
    linear("tb", "Terabyte", 1_099_511_627_776.0),
    linear("pb", "Petabyte", 1_125_899_906_842_624.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    Length,
    Weight,
    Temperature,
    Area,
    Volume,
    Speed,
    Pressure,
    Energy,
    Data,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Length,
        Category::Weight,
        Category::Temperature,
        Category::Area,
        Category::Volume,
        Category::Speed,
        Category::Pressure,
        Category::Energy,
        Category::Data,
    ];

    pub fn units(self) -> &'static [Unit] {
        match self {
            Category::Length => LENGTH,
            Category::Weight => WEIGHT,
            Category::Temperature => TEMPERATURE,
            Category::Area => AREA,
            Category::Volume => VOLUME,
            Category::Speed => SPEED,
            Category::Pressure => PRESSURE,
            Category::Energy => ENERGY,
            Category::Data => DATA,
        }
    }

    /// Symbols are matched case insensitively.
    pub fn unit(self, symbol: &str) -> Option<&'static Unit> {
        self.units()
            .iter()
            .find(|unit| unit.symbol.eq_ignore_ascii_case(symbol))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Length => "Length",
            Category::Weight => "Weight",
            Category::Temperature => "Temperature",
            Category::Area => "Area",
            Category::Volume => "Volume",
            Category::Speed => "Speed",
            Category::Pressure => "Pressure",
            Category::Energy => "Energy",
            Category::Data => "Data",
        };
        write!(f, "{name}")
    }
}

/// First category that knows the unit.
pub fn category_of(symbol: &str) -> Option<Category> {
    Category::ALL
        .into_iter()
        .find(|category| category.unit(symbol).is_some())
}

/// First category that knows both units.
pub fn detect_category(from: &str, to: &str) -> Option<Category> {
    Category::ALL
        .into_iter()
        .find(|category| category.unit(from).is_some() && category.unit(to).is_some())
}

fn to_celsius(symbol: &str, value: f64) -> f64 {
    match symbol {
        "fahrenheit" => (value - 32.) * 5. / 9.,
        "kelvin" => value - 273.15,
        "rankine" => (value - 491.67) * 5. / 9.,
        _ => value,
    }
}

fn from_celsius(symbol: &str, celsius: f64) -> f64 {
    match symbol {
        "fahrenheit" => celsius * 9. / 5. + 32.,
        "kelvin" => celsius + 273.15,
        "rankine" => (celsius + 273.15) * 9. / 5.,
        _ => celsius,
    }
}

fn apply(value: f64, from: &Unit, to: &Unit) -> f64 {
    if from == to {
        return value;
    }
    match (from.scale, to.scale) {
        (Scale::Factor(from_factor), Scale::Factor(to_factor)) => value * from_factor / to_factor,
        _ => from_celsius(to.symbol, to_celsius(from.symbol, value)),
    }
}

fn unknown_unit(category: Category, symbol: &str) -> DaybookError {
    DaybookError::UnknownUnit(format!("{symbol} (in {category})"))
}

fn resolve(category: Category, symbol: &str) -> Result<&'static Unit, DaybookError> {
    category
        .unit(symbol)
        .ok_or_else(|| unknown_unit(category, symbol))
}

#[derive(Debug, PartialEq)]
pub struct Conversion {
    pub category: Category,
    pub value: f64,
    pub from: &'static Unit,
    pub result: f64,
    pub to: &'static Unit,
}

impl Display for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}) = {} {} ({})",
            format_value(self.value),
            self.from.name,
            self.from.symbol,
            format_value(self.result),
            self.to.name,
            self.to.symbol
        )
    }
}

/// Converts `value` between two units. Without a category the first one holding both units is
/// used.
pub fn convert(value: f64, from: &str, to: &str, category: Option<Category>) -> Result<Conversion> {
    let category = match category {
        Some(category) => category,
        None => detect_category(from, to).ok_or_else(|| match (category_of(from), category_of(to)) {
            (None, _) => DaybookError::UnknownUnit(from.to_string()),
            (_, None) => DaybookError::UnknownUnit(to.to_string()),
            _ => DaybookError::IncompatibleUnits {
                from: from.to_string(),
                to: to.to_string(),
            },
        })?,
    };
    let from = resolve(category, from)?;
    let to = resolve(category, to)?;
    Ok(Conversion {
        category,
        value,
        from,
        result: apply(value, from, to),
        to,
    })
}

/// Converts into every unit of `targets`, or into every other unit of the category when
/// `targets` is empty.
pub fn convert_all(
    value: f64,
    from: &str,
    category: Category,
    targets: &[String],
) -> Result<Vec<Conversion>> {
    let from = resolve(category, from)?;
    let targets = if targets.is_empty() {
        category.units().iter().collect::<Vec<_>>()
    } else {
        targets
            .iter()
            .map(|symbol| resolve(category, symbol))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(targets
        .into_iter()
        .filter(|to| *to != from)
        .map(|to| Conversion {
            category,
            value,
            from,
            result: apply(value, from, to),
            to,
        })
        .collect())
}

/// How many times the first quantity fits into the second.
pub fn ratio(
    first: (f64, &str),
    second: (f64, &str),
    category: Category,
) -> Result<f64> {
    let first_unit = resolve(category, first.1)?;
    let second_unit = resolve(category, second.1)?;
    let (Scale::Factor(first_factor), Scale::Factor(second_factor)) =
        (first_unit.scale, second_unit.scale)
    else {
        bail!("Ratios of temperatures are not supported");
    };
    let denominator = second.0 * second_factor;
    if denominator == 0. {
        bail!("Cannot calculate a ratio to zero");
    }
    Ok(first.0 * first_factor / denominator)
}

/// Picks a unit of the same category that expresses `value` with a magnitude of at least 1 and
/// as few digits as possible. Temperatures stay in their unit.
pub fn best_unit(value: f64, from: &str) -> Result<Conversion> {
    let category = category_of(from).ok_or_else(|| DaybookError::UnknownUnit(from.to_string()))?;
    let from = resolve(category, from)?;
    let Scale::Factor(from_factor) = from.scale else {
        return Ok(Conversion {
            category,
            value,
            from,
            result: value,
            to: from,
        });
    };

    let base = value * from_factor;
    let mut best = from;
    let mut best_magnitude = value.abs();
    for unit in category.units() {
        let Scale::Factor(factor) = unit.scale else {
            continue;
        };
        let magnitude = (base / factor).abs();
        if (1.0..best_magnitude).contains(&magnitude) || (best_magnitude < 1. && magnitude >= 1.) {
            best = unit;
            best_magnitude = magnitude;
        }
    }
    Ok(Conversion {
        category,
        value,
        from,
        result: apply(value, from, best),
        to: best,
    })
}

fn trim_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

/// Six significant digits below 1, four below 100, two decimals above.
pub fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 100. || value == 0. || !value.is_finite() {
        return trim_zeros(&format!("{value:.2}"));
    }
    let digits = if magnitude < 1. { 6 } else { 4 };
    let exponent = magnitude.log10().floor() as i32;
    if exponent < -4 {
        let scientific = format!("{value:.*e}", (digits - 1) as usize);
        return match scientific.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_zeros(mantissa)),
            None => scientific,
        };
    }
    let decimals = (digits - 1 - exponent).max(0) as usize;
    trim_zeros(&format!("{value:.decimals$}"))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::error::DaybookError;

    use super::{best_unit, convert, convert_all, detect_category, format_value, ratio, Category};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.)
    }

    #[test]
    fn converts_with_detected_category() -> Result<()> {
        let conversion = convert(1.5, "km", "m", None)?;
        assert_eq!(conversion.category, Category::Length);
        assert_eq!(conversion.result, 1500.);

        let miles = convert(1., "MILE", "km", None)?;
        assert!(close(miles.result, 1.60934));

        assert_eq!(detect_category("kb", "gb"), Some(Category::Data));
        assert_eq!(convert(3., "kg", "kg", None)?.result, 3.);
        Ok(())
    }

    #[test]
    fn temperatures_go_through_celsius() -> Result<()> {
        assert!(close(convert(100., "celsius", "fahrenheit", None)?.result, 212.));
        assert!(close(convert(0., "celsius", "kelvin", None)?.result, 273.15));
        assert!(close(convert(32., "fahrenheit", "celsius", None)?.result, 0.));
        assert!(close(convert(0., "celsius", "rankine", None)?.result, 491.67));
        Ok(())
    }

    #[test]
    fn mismatched_units_are_rejected() {
        let err = convert(1., "kg", "m", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaybookError>(),
            Some(DaybookError::IncompatibleUnits { .. })
        ));
        let err = convert(1., "parsec", "m", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaybookError>(),
            Some(DaybookError::UnknownUnit(v)) if v == "parsec"
        ));
        assert!(convert(1., "kg", "g", Some(Category::Length)).is_err());
    }

    #[test]
    fn all_conversions_skip_the_source() -> Result<()> {
        let all = convert_all(1., "kb", Category::Data, &[])?;
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|c| c.to.symbol != "kb"));
        assert_eq!(all[0].result, 1024.);

        let some = convert_all(2., "l", Category::Volume, &["ml".into(), "m3".into()])?;
        assert_eq!(some.len(), 2);
        assert!(close(some[0].result, 2000.));
        assert!(convert_all(2., "l", Category::Volume, &["furlong".into()]).is_err());
        Ok(())
    }

    #[test]
    fn ratios_compare_base_values() -> Result<()> {
        assert_eq!(ratio((1., "km"), (500., "m"), Category::Length)?, 2.);
        assert!(ratio((1., "km"), (0., "m"), Category::Length).is_err());
        assert!(ratio((1., "celsius"), (1., "kelvin"), Category::Temperature).is_err());
        Ok(())
    }

    #[test]
    fn best_unit_prefers_small_numbers_above_one() -> Result<()> {
        let km = best_unit(1500., "m")?;
        assert_eq!(km.to.symbol, "km");
        assert_eq!(km.result, 1.5);

        let kb = best_unit(2048., "b")?;
        assert_eq!(kb.to.symbol, "kb");
        assert_eq!(kb.result, 2.);

        let warm = best_unit(25., "celsius")?;
        assert_eq!(warm.to.symbol, "celsius");
        assert_eq!(warm.result, 25.);
        Ok(())
    }

    #[test]
    fn values_are_formatted_by_magnitude() {
        assert_eq!(format_value(1.5), "1.5");
        assert_eq!(format_value(32.), "32");
        assert_eq!(format_value(1609.34), "1609.34");
        assert_eq!(format_value(0.000123456789), "0.000123457");
        assert_eq!(format_value(0.000001), "1e-6");
        assert_eq!(format_value(0.), "0");
    }
}
