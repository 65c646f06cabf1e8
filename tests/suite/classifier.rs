//! Request classification through the public engine API.

use kxpert_engine::{ClassificationResult, RequestClassifier, classify};

#[test]
fn image_request_strips_triggers() {
    assert_eq!(
        classify("generate an image of a cat"),
        ClassificationResult::ImageRequest {
            cleaned_prompt: "a cat".to_string()
        }
    );
}

#[test]
fn video_phrase_wins_over_image_keywords() {
    let result = classify("create a video of a cat dancing");
    assert!(matches!(result, ClassificationResult::VideoRequest { .. }));
    assert_eq!(result.cleaned_prompt(), Some("a cat dancing"));
}

#[test]
fn action_word_alone_is_plain_chat() {
    assert_eq!(classify("make me laugh"), ClassificationResult::PlainChat);
    assert_eq!(classify("show me how to sort a list"), ClassificationResult::PlainChat);
}

#[test]
fn matching_ignores_case() {
    assert_eq!(
        classify("GENERATE AN IMAGE OF A CASTLE"),
        ClassificationResult::ImageRequest {
            cleaned_prompt: "A CASTLE".to_string()
        }
    );
}

#[test]
fn separate_classifiers_agree_and_do_not_drift() {
    let inputs = [
        "",
        "hello there",
        "visualize a photo of the northern lights",
        "I need art for my band",
        "animate the logo",
        "make a video",
    ];
    let own = RequestClassifier::new();
    for input in inputs {
        let first = classify(input);
        assert_eq!(first, classify(input), "{input:?}");
        assert_eq!(first, own.classify(input), "{input:?}");
    }
}

#[test]
fn media_requests_never_have_empty_prompts() {
    for input in ["draw a picture", "make a video", "animate", "image of art"] {
        let result = classify(input);
        let prompt = result.cleaned_prompt().expect("media request");
        assert!(!prompt.trim().is_empty(), "{input:?}");
    }
}

#[test]
fn subject_words_match_as_substrings() {
    for (input, prompt) in [
        ("make a photograph of a bridge", "a bridge"),
        ("generate artwork of a dragon", "a dragon"),
    ] {
        assert_eq!(
            classify(input),
            ClassificationResult::ImageRequest {
                cleaned_prompt: prompt.to_string()
            },
            "{input:?}"
        );
    }
}
