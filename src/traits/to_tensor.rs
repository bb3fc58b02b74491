use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

/// A trait for converting items to tensors
///
/// Commonly implemented for `Vec<T>` to convert batches of `T` to a tensor of dimension `D`
///
/// Used by the rollout and the optimisation step to turn `Vec<E::State>` into a
/// `[batch, features]` tensor
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

// Marker trait to restrict blanket implementations
trait IntoData<const D: usize> {}

impl<const D: usize> IntoData<D> for TensorData {}
impl<const D: usize> IntoData<D> for &TensorData {}

impl<E, const A: usize, const B: usize, const C: usize, const D: usize> IntoData<4>
    for [[[[E; D]; C]; B]; A]
{
}
impl<E, const A: usize, const B: usize, const C: usize> IntoData<3> for [[[E; C]; B]; A] {}
impl<E, const A: usize, const B: usize> IntoData<2> for [[E; B]; A] {}
impl<E, const A: usize> IntoData<1> for [E; A] {}

impl<B, const D: usize, K, T> ToTensor<B, D, K> for T
where
    B: Backend,
    K: BasicOps<B>,
    T: Into<TensorData> + IntoData<D>,
{
    fn to_tensor(self, device: &<B as Backend>::Device) -> Tensor<B, D, K> {
        Tensor::from_data(self.into(), device)
    }
}

// Implementations

impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &<B as Backend>::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]), device)
    }
}

impl<B, E, K, const A: usize> ToTensor<B, 2, K> for Vec<[E; A]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch_size = self.len();
        // Pre-allocate exact capacity to avoid reallocation
        let mut flat = Vec::with_capacity(batch_size * A);

        // Use extend_from_slice instead of flatten().collect() for better performance
        for array in self.iter() {
            flat.extend_from_slice(array);
        }

        let data = TensorData::new(flat, [batch_size, A]);
        Tensor::<B, 2, K>::from_data(data, device)
    }
}

/// Rows of equal length, e.g. states returned by [`GymEnv`](crate::gym::GymEnv)
impl<B, E, K> ToTensor<B, 2, K> for Vec<Vec<E>>
where
    B: Backend,
    E: Element,
    K: BasicOps<B, Elem = E>,
{
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch_size = self.len();
        let width = self.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(batch_size * width);
        for row in self.iter() {
            debug_assert_eq!(row.len(), width, "ragged rows cannot form a tensor");
            flat.extend_from_slice(row);
        }

        Tensor::<B, 2, K>::from_data(TensorData::new(flat, [batch_size, width]), device)
    }
}
