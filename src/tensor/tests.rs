#[cfg(test)]
mod tests {
    use crate::error::LayerError;
    use crate::tensor::Blob;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_blob_creation_and_legacy_accessors() {
        let blob = Blob::from_vec((0..24).map(|x| x as f64).collect(), &[2, 3, 2, 2]).unwrap();
        assert_eq!(blob.shape(), &[2, 3, 2, 2]);
        assert_eq!(blob.count(), 24);
        assert_eq!(blob.num(), 2);
        assert_eq!(blob.channels(), 3);
        assert_eq!(blob.height(), 2);
        assert_eq!(blob.width(), 2);
        assert_eq!(blob.sample_dim(), 12);
        assert!(blob.diff().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_missing_axes_read_as_one() {
        let blob = Blob::<f32>::zeros(&[5, 7]);
        assert_eq!(blob.num(), 5);
        assert_eq!(blob.channels(), 7);
        assert_eq!(blob.height(), 1);
        assert_eq!(blob.width(), 1);
        assert_eq!(blob.legacy_dims().unwrap(), (5, 7, 1, 1));
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let result = Blob::from_vec(vec![1.0f64, 2.0, 3.0], &[2, 2]);
        assert!(matches!(result, Err(LayerError::ShapeMismatch(_))));
    }

    #[test]
    fn test_legacy_dims_rejects_high_rank() {
        let blob = Blob::<f64>::zeros(&[1, 1, 1, 1, 2]);
        assert!(matches!(blob.legacy_dims(), Err(LayerError::InvalidBatch(_))));
        assert!(blob.batch_view().is_err());
    }

    #[test]
    fn test_reshape_same_count_keeps_values() {
        let mut blob = Blob::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        blob.reshape(&[3, 2]).unwrap();
        assert_eq!(blob.shape(), &[3, 2]);
        assert_eq!(
            blob.data().iter().copied().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(blob.diff().shape(), &[3, 2]);
    }

    #[test]
    fn test_reshape_new_count_zeroes() {
        let mut blob = Blob::from_vec(vec![1.0f32; 4], &[2, 2]).unwrap();
        blob.diff_mut().fill(3.0);
        blob.reshape(&[3, 3]).unwrap();
        assert_eq!(blob.count(), 9);
        assert!(blob.data().iter().all(|&x| x == 0.0));
        assert!(blob.diff().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_reshape_like() {
        let source = Blob::<f64>::zeros(&[4, 2, 3, 3]);
        let mut target = Blob::<f32>::zeros(&[1]);
        target.reshape_like(&source).unwrap();
        assert_eq!(target.shape(), source.shape());
    }

    #[test]
    fn test_sample_rows_flatten_each_sample() {
        let blob = Blob::from_vec((0..12).map(|x| x as f64).collect(), &[3, 2, 1, 2]).unwrap();
        let rows = blob.sample_rows().unwrap();
        assert_eq!(rows.dim(), (3, 4));
        assert_eq!(rows.row(1).to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_batch_view_indexing() {
        // index = n * C*H*W + c * H*W + h * W + w
        let blob = Blob::from_vec((0..24).map(|x| x as f64).collect(), &[2, 3, 2, 2]).unwrap();
        let view = blob.batch_view().unwrap();
        assert_eq!(view[[1, 2, 0, 1]], 12.0 + 8.0 + 0.0 + 1.0);
    }

    #[test]
    fn test_randn_shape_and_spread() {
        let mut rng = StdRng::seed_from_u64(11);
        let blob = Blob::<f64>::randn(&[64, 16], &mut rng);
        assert_eq!(blob.shape(), &[64, 16]);
        let mean = blob.data().iter().sum::<f64>() / blob.count() as f64;
        assert!(mean.abs() < 0.2, "mean of standard normal samples was {}", mean);
    }

    #[test]
    fn test_clear_diff() {
        let mut blob = Blob::<f64>::zeros(&[2, 2]);
        blob.diff_mut().fill(1.5);
        blob.clear_diff();
        assert!(blob.diff().iter().all(|&g| g == 0.0));
    }
}
