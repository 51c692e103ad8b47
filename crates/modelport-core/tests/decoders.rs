use anyhow::Result;
use modelport_core::{
    argmax, Classification, ClassificationDecoder, Error, ResultDecoder, Shape,
    SuperResolutionDecoder, TensorBuffer, FLOWER_LABELS,
};

fn scores(values: &[f32]) -> Result<TensorBuffer> {
    Ok(TensorBuffer::new(
        Shape::from_slice(&[1, values.len()]),
        values.to_vec(),
    )?)
}

#[test]
fn classification_picks_the_maximum() -> Result<()> {
    let decoder = ClassificationDecoder::new(FLOWER_LABELS);
    let result = decoder.decode(&scores(&[0.1, 0.9, 0.05, 0.0, 0.2])?)?;

    assert_eq!(result.index, 1);
    assert_eq!(result.label, "dandelion");
    assert_eq!(result.score(), Some(0.9));
    Ok(())
}

#[test]
fn classification_ties_go_to_the_first_index() -> Result<()> {
    let decoder = ClassificationDecoder::new(FLOWER_LABELS);
    let result = decoder.decode(&scores(&[0.5, 0.5, 0.0, 0.0, 0.0])?)?;

    assert_eq!(result.index, 0);
    assert_eq!(result.label, "daisy");
    assert_eq!(argmax(&[0.0, 3.0, 3.0]), 1);
    Ok(())
}

#[test]
fn nan_scores_never_win() -> Result<()> {
    assert_eq!(argmax(&[f32::NAN, 0.2, 0.7]), 2);
    assert_eq!(argmax(&[0.4, f32::NAN, 0.1]), 0);
    assert_eq!(argmax(&[f32::NAN, f32::NAN]), 0);

    let decoder = ClassificationDecoder::new(FLOWER_LABELS);
    let result = decoder.decode(&scores(&[f32::NAN, 0.1, 0.3, 0.2, 0.0])?)?;
    assert_eq!(result.label, "roses");
    Ok(())
}

#[test]
fn score_out_of_range_is_none() {
    let result = Classification {
        index: 3,
        label: "sunflowers".to_string(),
        scores: vec![0.1, 0.2],
    };
    assert_eq!(result.score(), None);
}

#[test]
fn classification_rejects_empty_output() -> Result<()> {
    let decoder = ClassificationDecoder::new(FLOWER_LABELS);
    let empty = TensorBuffer::new(Shape::from_slice(&[1, 0]), Vec::new())?;

    assert_eq!(decoder.decode(&empty).unwrap_err(), Error::EmptyOutput);
    Ok(())
}

#[test]
fn classification_rejects_wrong_rank_and_width() -> Result<()> {
    let decoder = ClassificationDecoder::new(FLOWER_LABELS);

    let rank3 = TensorBuffer::new(Shape::from_slice(&[1, 1, 5]), vec![0.0; 5])?;
    assert!(matches!(
        decoder.decode(&rank3),
        Err(Error::ShapeMismatch { .. })
    ));

    let too_wide = scores(&[0.0; 7])?;
    assert!(matches!(
        decoder.decode(&too_wide),
        Err(Error::ShapeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn probabilities_are_a_softmax() -> Result<()> {
    let decoder = ClassificationDecoder::new(["a", "b"]);
    let result = decoder.decode(&scores(&[0.0, 0.0])?)?;

    let probs = result.probabilities();
    assert_eq!(probs, vec![0.5, 0.5]);

    let result = decoder.decode(&scores(&[1.0, 3.0])?)?;
    let probs = result.probabilities();
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    assert!(probs[1] > probs[0]);
    Ok(())
}

#[test]
fn super_resolution_reads_a_zero_grid() -> Result<()> {
    let decoder = SuperResolutionDecoder::default();
    let output = TensorBuffer::new(
        Shape::from_slice(&[1, 128, 128, 3]),
        vec![0.0; 128 * 128 * 3],
    )?;

    let grid = decoder.decode(&output)?;
    assert_eq!((grid.height, grid.width, grid.channels), (128, 128, 3));
    assert!(grid.data.iter().all(|v| *v == 0.0));
    assert_eq!(grid.pixel(127, 127), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(grid.pixel(128, 0), None);
    Ok(())
}

#[test]
fn super_resolution_rejects_other_sizes() -> Result<()> {
    let decoder = SuperResolutionDecoder::default();
    let output = TensorBuffer::new(Shape::from_slice(&[1, 64, 64, 3]), vec![0.0; 64 * 64 * 3])?;

    assert_eq!(
        decoder.decode(&output).unwrap_err(),
        Error::ShapeMismatch {
            expected: "[1, 128, 128, 3]".to_string(),
            actual: "[1, 64, 64, 3]".to_string(),
        }
    );
    Ok(())
}

#[test]
fn pixel_indexing_is_channel_last() -> Result<()> {
    let decoder = SuperResolutionDecoder::new(2, 2, 3);
    let output = TensorBuffer::new(
        Shape::from_slice(&[1, 2, 2, 3]),
        (0..12).map(|v| v as f32).collect(),
    )?;

    let grid = decoder.decode(&output)?;
    assert_eq!(grid.pixel(0, 1), Some(&[3.0, 4.0, 5.0][..]));
    assert_eq!(grid.pixel(1, 0), Some(&[6.0, 7.0, 8.0][..]));
    Ok(())
}
