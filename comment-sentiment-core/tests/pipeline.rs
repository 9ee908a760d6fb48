use comment_sentiment_core::{
    config::ModelBuildingConfig,
    dataset::{stratified_split, Label, ProcessedComment, RawComment},
    features::{engineer_features, FeatureSchema, TfidfVectorizer},
    metrics,
    model::SentimentClassifier,
};

fn balanced_corpus(total: usize) -> Vec<RawComment> {
    let phrases = [
        (Label::Positive, "absolutely love this, great amazing wonderful video"),
        (Label::Negative, "hate this terrible awful boring worst video"),
        (Label::Neutral, "the video exists, okay average nothing special"),
    ];
    (0..total)
        .map(|i| {
            let (category, phrase) = phrases[i % phrases.len()];
            RawComment {
                comment: format!("{} number {}", phrase, i),
                category,
            }
        })
        .collect()
}

fn test_params() -> ModelBuildingConfig {
    ModelBuildingConfig {
        ngram_range: (1, 2),
        max_features: 300,
        n_estimators: 40,
        max_depth: 4,
        min_child_samples: 1,
        learning_rate: 0.3,
        colsample_bytree: 1.0,
        subsample: 1.0,
        ..Default::default()
    }
}

fn process(rows: Vec<RawComment>) -> Vec<ProcessedComment> {
    rows.into_iter().map(engineer_features).collect()
}

fn documents(comments: &[ProcessedComment]) -> Vec<String> {
    comments.iter().map(|c| c.clean_comment.clone()).collect()
}

fn labels(comments: &[ProcessedComment]) -> Vec<Label> {
    comments.iter().map(|c| c.category).collect()
}

#[test]
fn end_to_end_split_train_evaluate() {
    let rows = balanced_corpus(100);
    let sets = stratified_split(rows, 0.2, 0.1, 42).unwrap();

    // classes of 34/33/33 rows with per-class round-to-nearest fractions
    assert_eq!(sets.train.len(), 70);
    assert_eq!(sets.val.len(), 9);
    assert_eq!(sets.test.len(), 21);

    for label in Label::ALL {
        let count = |set: &[RawComment]| set.iter().filter(|r| r.category == label).count();
        assert!(count(&sets.train) >= 23);
        assert!(count(&sets.val) >= 3);
        assert!(count(&sets.test) >= 7);
    }

    let train = process(sets.train);
    let test = process(sets.test);

    let params = test_params();
    let train_documents = documents(&train);
    let vectorizer = TfidfVectorizer::fit(&train_documents, params.ngram_range, params.max_features).unwrap();
    let schema = FeatureSchema::for_vectorizer(&vectorizer);

    let train_matrix = schema.assemble(vectorizer.transform(&train_documents), &train).unwrap();
    assert_eq!(train_matrix.len(), train.len());
    for row in &train_matrix {
        assert_eq!(row.len(), vectorizer.vocabulary().len() + 4);
    }

    let model = SentimentClassifier::fit(&train_matrix, &labels(&train), &params).unwrap();

    // sanity check on the training partition itself, not a generalization claim
    let train_predictions = model.predict(&train_matrix).unwrap();
    let train_actual = labels(&train);
    let correct = train_predictions.iter().zip(&train_actual).filter(|(p, a)| p == a).count();
    assert!(
        correct as f64 / train_actual.len() as f64 >= 0.9,
        "training accuracy below 0.9: {}/{}",
        correct,
        train_actual.len(),
    );

    // the held-out partition flows through the same persisted column layout
    let test_matrix = schema.assemble(vectorizer.transform(&documents(&test)), &test).unwrap();
    let evaluation = metrics::evaluate(&labels(&test), &model.predict(&test_matrix).unwrap()).unwrap();
    assert!(evaluation.accuracy > 0.0);
    assert_eq!(evaluation.per_class.len(), 3);
}

#[test]
fn persisted_artifacts_reproduce_predictions() {
    let train = process(balanced_corpus(60));
    let params = test_params();

    let train_documents = documents(&train);
    let vectorizer = TfidfVectorizer::fit(&train_documents, params.ngram_range, params.max_features).unwrap();
    let schema = FeatureSchema::for_vectorizer(&vectorizer);
    let matrix = schema.assemble(vectorizer.transform(&train_documents), &train).unwrap();
    let model = SentimentClassifier::fit(&matrix, &labels(&train), &params).unwrap();

    let dir = tempfile::tempdir().unwrap();
    vectorizer.save(&dir.path().join("tfidf_vectorizer.json")).unwrap();
    schema.save(&dir.path().join("feature_schema.json")).unwrap();
    model.save(&dir.path().join("sentiment_model.json")).unwrap();

    let loaded_vectorizer = TfidfVectorizer::load(&dir.path().join("tfidf_vectorizer.json")).unwrap();
    let loaded_schema = FeatureSchema::load(&dir.path().join("feature_schema.json")).unwrap();
    let loaded_model = SentimentClassifier::load(&dir.path().join("sentiment_model.json")).unwrap();

    assert_eq!(loaded_schema, schema);
    let reloaded_matrix = loaded_schema
        .assemble(loaded_vectorizer.transform(&train_documents), &train)
        .unwrap();
    assert_eq!(reloaded_matrix, matrix);
    assert_eq!(
        loaded_model.predict(&reloaded_matrix).unwrap(),
        model.predict(&matrix).unwrap(),
    );
}
