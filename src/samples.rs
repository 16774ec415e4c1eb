//! Built-in records fed through the exported graph when no samples file is
//! configured

use ml_wine_clustering::WineRecord;

/// Two hand-picked records from the high-alcohol, high-proline cultivar
pub fn builtin_samples() -> Vec<WineRecord> {
    vec![
        WineRecord::from_values([
            13.4, 2.3, 2.5, 19.8, 99.5, 2.5, 2.3, 0.2, 1.3, 3.1, 0.6, 2.1, 1050.0,
        ]),
        WineRecord::from_values([
            14.0, 1.8, 2.4, 20.5, 99.0, 2.4, 2.1, 0.3, 1.2, 3.0, 0.7, 2.0, 1030.0,
        ]),
    ]
}
