pub mod categorical_encoder;
pub mod feature_preprocessing_utils;
pub mod features_extractor;
pub mod processor_price_table;
pub mod processor_vectorizer;
pub mod value_normalizer;
