use crate::model::models::ForestFireInputType;

/**
 * (year, autonomous community, number of accidents, percentage of large fires)
 */
type SeedRow = (i64, &'static str, u32, f64);

const INITIAL_DATA: [SeedRow; 11] = [
    (2024, "andalucia", 10034, 0.39),
    (2024, "aragon", 5877, 0.59),
    (2024, "asturias", 19003, 0.25),
    (2024, "comunidad valenciana", 6982, 0.68),
    (2024, "canarias", 1313, 0.82),
    (2024, "cantabria", 8316, 0.29),
    (2024, "castilla-la mancha", 9864, 0.42),
    (2024, "castilla y leon", 20343, 0.47),
    (2024, "cataluña", 7756, 0.37),
    (2024, "ceuta", 7, 0.0),
    (2024, "comunidad de madrid", 6390, 0.48),
];

const ALVARO_DATA: [SeedRow; 22] = [
    (2006, "andalucia", 8034, 0.19),
    (2006, "aragon", 3877, 0.39),
    (2006, "asturias", 17003, 0.05),
    (2006, "comunidad valenciana", 3982, 0.48),
    (2006, "canarias", 1113, 0.72),
    (2006, "cantabria", 6316, 0.09),
    (2006, "castilla-la mancha", 7864, 0.22),
    (2006, "castilla y leon", 18343, 0.27),
    (2006, "cataluña", 5756, 0.17),
    (2006, "ceuta", 5, 0.0),
    (2006, "comunidad de madrid", 4390, 0.28),
    (2016, "andalucia", 8347, 0.17),
    (2016, "aragon", 3567, 0.37),
    (2016, "asturias", 16200, 0.04),
    (2016, "comunidad valenciana", 3802, 0.46),
    (2016, "canarias", 1056, 0.7),
    (2016, "cantabria", 6269, 0.09),
    (2016, "castilla-la mancha", 7390, 0.2),
    (2016, "castilla y leon", 19100, 0.23),
    (2016, "cataluña", 5345, 0.17),
    (2016, "ceuta", 4, 0.0),
    (2016, "comunidad de madrid", 4909, 0.3),
];

/**
 * Records loaded by `loadInitialData`.
 */
pub fn initial_data() -> Vec<ForestFireInputType> {
    to_inputs(&INITIAL_DATA)
}

/**
 * Records appended by `loadAlvaroData`.
 */
pub fn alvaro_data() -> Vec<ForestFireInputType> {
    to_inputs(&ALVARO_DATA)
}

fn to_inputs(rows: &[SeedRow]) -> Vec<ForestFireInputType> {
    rows.iter()
        .map(|(year, autonomous_community, number_of_accidents, percentage_of_large_fires)| ForestFireInputType {
            year: *year,
            autonomous_community: autonomous_community.to_lowercase(),
            number_of_accidents: f64::from(*number_of_accidents),
            percentage_of_large_fires: *percentage_of_large_fires,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_seed_sizes() {
        assert_eq!(initial_data().len(), 11);
        assert_eq!(alvaro_data().len(), 22);
    }

    #[test]
    fn test_seed_keys_unique_across_datasets() {
        let keys: HashSet<(i64, String)> = initial_data().into_iter().chain(alvaro_data()).map(|record| (record.year, record.autonomous_community)).collect();
        assert_eq!(keys.len(), 33);
    }
}
