//! End-to-end scenarios mirroring the literal examples in the specification.

use kmeans_core::prelude::*;

#[test]
fn s1_dense_two_cluster_split_and_centroids() {
    let mut data = vec![
        Vector::dense(vec![0.1, 0.8]),
        Vector::dense(vec![0.2, 0.7]),
        Vector::dense(vec![0.5, 0.45]),
        Vector::dense(vec![0.6, 0.5]),
    ];

    let kmeans = KMeans::new(KMeansConfig::new().with_plus_plus_init(true));
    let (labels, centroids) = kmeans.cluster(&mut data, 2, 8).unwrap();

    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[2], labels[3]);
    assert_ne!(labels[0], labels[2]);

    let first_pair_centroid = &centroids[labels[0]];
    let second_pair_centroid = &centroids[labels[2]];

    let expected_first = Vector::dense(vec![0.15, 0.75]);
    let expected_second = Vector::dense(vec![0.55, 0.475]);
    assert!(first_pair_centroid.value_equals(&expected_first, 1e-3));
    assert!(second_pair_centroid.value_equals(&expected_second, 1e-3));
}

#[test]
fn s2_spherical_sparse_two_cluster_split_unit_centroids() {
    let mut data = vec![
        Vector::sparse(vec![0, 1, 3], vec![0.1, 0.8, 0.05]).unwrap(),
        Vector::sparse(vec![0, 1, 3], vec![0.2, 0.7, 0.06]).unwrap(),
        Vector::sparse(vec![0, 1, 3], vec![0.5, 0.45, 0.9]).unwrap(),
        Vector::sparse(vec![0, 1, 3], vec![0.6, 0.5, 0.95]).unwrap(),
    ];

    let kmeans = KMeans::new(KMeansConfig::new().with_spherical(true));
    let (labels, centroids) = kmeans.cluster(&mut data, 2, 8).unwrap();

    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[2], labels[3]);
    assert_ne!(labels[0], labels[2]);

    for c in &centroids {
        assert!(c.is_unit_length());
    }

    let second_pair_centroid = centroids[labels[2]].as_sparse().unwrap();
    let coord3_pos = second_pair_centroid
        .indices()
        .iter()
        .position(|&i| i == 3)
        .expect("coordinate 3 present");
    let coord3_val = second_pair_centroid.values()[coord3_pos].abs();
    for (pos, &val) in second_pair_centroid.values().iter().enumerate() {
        if pos != coord3_pos {
            assert!(coord3_val >= val.abs());
        }
    }
}

#[test]
fn s3_index_nearby_is_superset_of_brute_force_at_several_thresholds() {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    let mut rng = ChaCha8Rng::seed_from_u64(20260729);
    let dim = 200u32;

    let mut vectors = Vec::new();
    for _ in 0..300 {
        let nnz = rng.gen_range(5..20);
        let mut indices: Vec<u32> = (0..dim).collect();
        for i in (1..indices.len()).rev() {
            let j = rng.gen_range(0..=i);
            indices.swap(i, j);
        }
        let mut idx: Vec<u32> = indices.into_iter().take(nnz).collect();
        idx.sort_unstable();
        let values: Vec<f32> = (0..idx.len()).map(|_| rng.gen::<f32>() + 0.1).collect();
        let mut v = Vector::sparse(idx, values).unwrap();
        v.normalize_as_unit_vector();
        vectors.push(v);
    }

    let mut index = DotProductIndex::new(vec![0.0, 0.1, 0.25, 0.5, 0.75]).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        index.add(v.as_sparse().unwrap(), i as u32).unwrap();
    }

    for q in vectors.iter().take(10) {
        for &lambda in &[0.05_f32, 0.25, 0.4, 0.6] {
            let found = index
                .nearby(q.as_sparse().unwrap(), lambda)
                .unwrap()
                .into_iter()
                .collect::<std::collections::HashSet<_>>();

            for (id, candidate) in vectors.iter().enumerate() {
                let dot = q.dot_product(candidate).unwrap();
                if dot >= lambda {
                    assert!(
                        found.contains(&(id as u32)),
                        "missed true positive at lambda={lambda}, dot={dot}"
                    );
                }
            }
        }
    }
}

/// Normalized mutual information between two label assignments over the
/// same items, using the arithmetic-mean normalization `2*I(X;Y)/(H(X)+H(Y))`.
fn normalized_mutual_information(a: &[usize], b: &[usize]) -> f64 {
    use std::collections::HashMap;

    let n = a.len() as f64;
    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    let mut count_a: HashMap<usize, usize> = HashMap::new();
    let mut count_b: HashMap<usize, usize> = HashMap::new();
    for (&x, &y) in a.iter().zip(b.iter()) {
        *joint.entry((x, y)).or_insert(0) += 1;
        *count_a.entry(x).or_insert(0) += 1;
        *count_b.entry(y).or_insert(0) += 1;
    }

    let mutual_info: f64 = joint
        .iter()
        .map(|(&(x, y), &count)| {
            let p_xy = count as f64 / n;
            let p_x = count_a[&x] as f64 / n;
            let p_y = count_b[&y] as f64 / n;
            p_xy * (p_xy / (p_x * p_y)).ln()
        })
        .sum();

    let entropy = |counts: &HashMap<usize, usize>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                -p * p.ln()
            })
            .sum()
    };
    let (h_a, h_b) = (entropy(&count_a), entropy(&count_b));
    if h_a + h_b <= 1e-12 {
        return 1.0;
    }
    2.0 * mutual_info / (h_a + h_b)
}

#[test]
fn s4_iris_like_dense_three_cluster_split_has_high_nmi_with_true_classes() {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(150);
    // Three well-separated blobs in the rough shape of the Iris measurement
    // ranges (sepal length/width, petal length/width), 50 points each.
    let centers = [
        [5.0f32, 3.4, 1.5, 0.2],
        [6.0, 2.8, 4.3, 1.3],
        [6.5, 3.0, 5.5, 2.0],
    ];

    let mut data = Vec::with_capacity(150);
    let mut true_classes = Vec::with_capacity(150);
    for (class, center) in centers.iter().enumerate() {
        for _ in 0..50 {
            let point: Vec<f32> = center
                .iter()
                .map(|&c| c + rng.gen_range(-0.3f32..0.3))
                .collect();
            data.push(Vector::dense(point));
            true_classes.push(class);
        }
    }

    let kmeans = KMeans::new(KMeansConfig::new());
    let (labels, centroids) = kmeans.cluster(&mut data, 3, 10).unwrap();
    assert_eq!(centroids.len(), 3);

    let score = normalized_mutual_information(&labels, &true_classes);
    assert!(score > 0.7, "NMI too low: {score}");
}

#[test]
fn s5_value_equals_is_reflexive_and_sensitive_to_a_single_coordinate_edit() {
    let v = Vector::sparse(vec![0, 2, 5], vec![1.0, 2.0, 3.0]).unwrap();
    assert!(v.value_equals(&v.clone(), 1e-6));

    let mut v2 = v.clone();
    {
        let s2 = match &mut v2 {
            Vector::Sparse(s) => s,
            _ => unreachable!(),
        };
        let pos = s2.indices().iter().position(|&i| i == 2).unwrap();
        let updated = s2.values()[pos] + 0.01;
        s2.set(2, updated).unwrap();
    }
    assert!(!v.value_equals(&v2, 1e-6));
}

#[test]
fn s6_dbscan_core_points_have_enough_neighbors_and_clusters_are_core_connected() {
    let mut data = Vec::new();
    for i in 0..10 {
        let jitter = i as f32 * 0.02;
        let mut v = Vector::sparse(vec![0, 1], vec![1.0, jitter]).unwrap();
        v.normalize_as_unit_vector();
        data.push(v);
    }
    // An isolated outlier.
    let mut outlier = Vector::sparse(vec![2, 3], vec![1.0, 0.0]).unwrap();
    outlier.normalize_as_unit_vector();
    data.push(outlier);

    let config = DbscanConfig::new()
        .with_max_distance(0.05)
        .with_min_num_samples(5)
        .with_distance_method(DistanceMethod::Cosine);
    let db = DbScan::new(config.clone());
    let (labels, _sizes) = db.cluster(&data).unwrap();

    let is_core = |i: usize| -> bool {
        (0..data.len())
            .filter(|&j| j != i && data[i].cosine_distance(&data[j]).unwrap() <= config.max_distance)
            .count()
            + 1
            >= config.min_num_samples
    };

    for (i, &label) in labels.iter().enumerate() {
        if label == -1 {
            continue;
        }
        assert!(
            is_core(i)
                || (0..data.len()).any(|j| j != i
                    && labels[j] == label
                    && is_core(j)
                    && data[i].cosine_distance(&data[j]).unwrap() <= config.max_distance),
            "non-noise point {i} is neither core nor reachable from a core neighbor"
        );
    }

    for cluster_id in labels.iter().copied().filter(|&l| l != -1).collect::<std::collections::BTreeSet<_>>() {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == cluster_id)
            .map(|(i, _)| i)
            .collect();
        let core_members: Vec<usize> = members.iter().copied().filter(|&i| is_core(i)).collect();
        assert!(!core_members.is_empty(), "cluster {cluster_id} has no core point");

        let mut reached = std::collections::HashSet::new();
        let mut stack = vec![core_members[0]];
        reached.insert(core_members[0]);
        while let Some(p) = stack.pop() {
            if !is_core(p) {
                continue;
            }
            for &q in &core_members {
                if !reached.contains(&q) && data[p].cosine_distance(&data[q]).unwrap() <= config.max_distance {
                    reached.insert(q);
                    stack.push(q);
                }
            }
        }
        assert_eq!(
            reached.len(),
            core_members.len(),
            "core points of cluster {cluster_id} are not all chain-connected"
        );
    }

    assert_eq!(labels[10], -1);
}
