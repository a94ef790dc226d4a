/*
 * File: /src/util.rs
 * Created Date: Tuesday, June 18th 2024
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */
extern crate nalgebra as na;
use na::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

pub fn clone_to_dmatrix<T>(array_view: ArrayView2<T>) -> DMatrix<T>
where
    T: Clone,
    T: na::Scalar,
{
    // from_vec is column-major, so build the transpose and flip it back
    let nrows = array_view.ncols();
    let ncols = array_view.nrows();
    let elements = array_view.iter().cloned().collect::<Vec<T>>();
    DMatrix::from_vec(nrows, ncols, elements).transpose()
}

pub fn clone_to_dvector(array_view: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(array_view.len(), array_view.iter().cloned())
}

pub fn dvector_to_array1(vector: &DVector<f64>) -> Array1<f64> {
    vector.iter().cloned().collect()
}
