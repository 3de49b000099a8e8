use crate::common_io::{mkdir, read_lines_of_types, write_lines, Delimiter};
use crate::traits::{IoOps, RowLabels};
use log::info;
use ndarray::prelude::*;
use std::fmt::{Debug, Display};
use std::str::FromStr;

impl<T> IoOps for Array2<T>
where
    T: FromStr + Send + Display,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip_cols: usize,
    ) -> anyhow::Result<Self::Mat> {
        let lines_of_values = read_lines_of_types::<T>(file, delim, skip_cols)?;

        if lines_of_values.is_empty() {
            return Err(anyhow::anyhow!("No data in file: {}", file));
        }

        let nrows = lines_of_values.len();
        let ncols = lines_of_values[0].len();

        if let Some(bad) = lines_of_values.iter().position(|x| x.len() != ncols) {
            return Err(anyhow::anyhow!(
                "{}: line {} has {} values, expected {}",
                file,
                bad,
                lines_of_values[bad].len(),
                ncols
            ));
        }

        let data = lines_of_values.into_iter().flatten().collect::<Vec<_>>();

        Ok(Array2::from_shape_vec((nrows, ncols), data)?)
    }

    fn write_file_delim(
        &self,
        file: &str,
        delim: &str,
        labels: RowLabels,
    ) -> anyhow::Result<()> {
        let lines: Vec<Box<str>> = self
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let values = row
                    .iter()
                    .map(|x| format!("{}", *x))
                    .collect::<Vec<String>>()
                    .join(delim);
                (labels.prefix(i, delim) + &values).into_boxed_str()
            })
            .collect();
        mkdir(file)?;
        write_lines(&lines, file)?;
        info!("wrote {} x {} matrix to {}", self.nrows(), self.ncols(), file);
        Ok(())
    }
}

/// A vector is stored as a column, one value per line
impl<T> IoOps for Array1<T>
where
    T: FromStr + Send + Display,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip_cols: usize,
    ) -> anyhow::Result<Self::Mat> {
        let lines_of_values = read_lines_of_types::<T>(file, delim, skip_cols)?;

        if lines_of_values.is_empty() {
            return Err(anyhow::anyhow!("No data in file: {}", file));
        }

        if let Some(bad) = lines_of_values.iter().position(|x| x.len() != 1) {
            return Err(anyhow::anyhow!(
                "{}: line {} has {} values, expected 1",
                file,
                bad,
                lines_of_values[bad].len()
            ));
        }

        Ok(lines_of_values.into_iter().flatten().collect())
    }

    fn write_file_delim(
        &self,
        file: &str,
        delim: &str,
        labels: RowLabels,
    ) -> anyhow::Result<()> {
        let lines: Vec<Box<str>> = self
            .iter()
            .enumerate()
            .map(|(i, x)| format!("{}{}", labels.prefix(i, delim), x).into_boxed_str())
            .collect();
        mkdir(file)?;
        write_lines(&lines, file)?;
        info!("wrote {} values to {}", self.len(), file);
        Ok(())
    }
}
