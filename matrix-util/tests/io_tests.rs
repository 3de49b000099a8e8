use matrix_util::common_io::{create_temp_dir_file, read_lines_of_types};
use matrix_util::traits::{IoOps, SampleOps};
use ndarray::{Array1, Array2};

#[test]
fn ndarray_io_test() -> anyhow::Result<()> {
    let xx = Array2::<f64>::runif(50, 7);

    let tsv_file = create_temp_dir_file("txt.gz")?;
    let tsv_file = tsv_file.to_str().unwrap();
    xx.to_tsv(tsv_file)?;

    let yy = Array2::<f64>::from_tsv(tsv_file)?;

    assert_eq!(xx, yy);

    Ok(())
}

#[test]
fn labelled_rows_test() -> anyhow::Result<()> {
    let xx = Array2::<f64>::rnorm(4, 3);
    let ids: Vec<Box<str>> = vec!["u17".into(), "u3".into(), "u99".into()];

    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();
    xx.to_labelled_tsv(tsv_file, Some(&ids[..]))?;

    // the first two words are labels
    let words = read_lines_of_types::<String>(tsv_file, "\t", 0)?;
    assert_eq!(words.len(), 4);
    assert_eq!(words[1][0].as_str(), "1");
    assert_eq!(words[1][1].as_str(), "u3");
    // no translation available for the last row
    assert_eq!(words[3][1].as_str(), "3");

    let yy = Array2::<f64>::from_labelled_tsv(tsv_file)?;
    approx::assert_abs_diff_eq!(xx, yy, epsilon = 1e-12);

    Ok(())
}

#[test]
fn vector_io_test() -> anyhow::Result<()> {
    let xx = Array1::from(vec![0.5, 1e-30, 3.25, 7.0]);

    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();
    xx.to_labelled_tsv(tsv_file, None)?;

    let yy = Array1::<f64>::from_labelled_tsv(tsv_file)?;
    assert_eq!(xx, yy);

    Ok(())
}

#[test]
fn ragged_rows_are_rejected() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();
    let lines: Vec<Box<str>> = vec!["1\t2\t3".into(), "4\t5".into()];
    matrix_util::common_io::write_lines(&lines, tsv_file)?;

    assert!(Array2::<f64>::from_tsv(tsv_file).is_err());
    Ok(())
}

#[test]
fn vector_lines_hold_one_value() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file("tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();
    let lines: Vec<Box<str>> = vec!["0\ta\t1.5".into(), "1\tb\t2.5\t3.5".into()];
    matrix_util::common_io::write_lines(&lines, tsv_file)?;

    assert!(Array1::<f64>::from_labelled_tsv(tsv_file).is_err());

    let lines: Vec<Box<str>> = vec!["1.5".into(), "2.5\t3.5".into()];
    matrix_util::common_io::write_lines(&lines, tsv_file)?;
    assert!(Array1::<f64>::from_tsv(tsv_file).is_err());
    Ok(())
}
