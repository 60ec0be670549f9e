use std::fmt;
use std::str::FromStr;

use crate::error::TrainError;

/// Image classification datasets the training glue knows about.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DatasetKind {
    /// Handwritten digits, 1×28×28.
    Mnist,
    /// Zalando clothing images, 1×28×28.
    FashionMnist,
    /// Street View house numbers, 3×32×32.
    Svhn,
    Cifar10,
    Cifar100,
    /// 3×96×96, labeled subset only.
    Stl10,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Mnist,
        DatasetKind::FashionMnist,
        DatasetKind::Svhn,
        DatasetKind::Cifar10,
        DatasetKind::Cifar100,
        DatasetKind::Stl10,
    ];

    /// Canonical name, also the dataset's directory under the data root.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Mnist => "MNIST",
            DatasetKind::FashionMnist => "FashionMNIST",
            DatasetKind::Svhn => "SVHN",
            DatasetKind::Cifar10 => "CIFAR10",
            DatasetKind::Cifar100 => "CIFAR100",
            DatasetKind::Stl10 => "STL10",
        }
    }

    /// Class names indexed by label.
    pub fn class_names(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Mnist | DatasetKind::Svhn => DIGITS,
            DatasetKind::FashionMnist => FASHION_MNIST,
            DatasetKind::Cifar10 => CIFAR10,
            DatasetKind::Cifar100 => CIFAR100,
            DatasetKind::Stl10 => STL10,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = TrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "").as_str() {
            "mnist" => Ok(DatasetKind::Mnist),
            "fashionmnist" => Ok(DatasetKind::FashionMnist),
            "svhn" => Ok(DatasetKind::Svhn),
            "cifar10" => Ok(DatasetKind::Cifar10),
            "cifar100" => Ok(DatasetKind::Cifar100),
            "stl10" => Ok(DatasetKind::Stl10),
            _ => Err(TrainError::UnknownDataset(s.to_string())),
        }
    }
}

const DIGITS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

const FASHION_MNIST: &[&str] = &[
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

const CIFAR10: &[&str] = &[
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

const STL10: &[&str] = &[
    "airplane", "bird", "car", "cat", "deer", "dog", "horse", "monkey", "ship", "truck",
];

const CIFAR100: &[&str] = &[
    "apple",
    "aquarium_fish",
    "baby",
    "bear",
    "beaver",
    "bed",
    "bee",
    "beetle",
    "bicycle",
    "bottle",
    "bowl",
    "boy",
    "bridge",
    "bus",
    "butterfly",
    "camel",
    "can",
    "castle",
    "caterpillar",
    "cattle",
    "chair",
    "chimpanzee",
    "clock",
    "cloud",
    "cockroach",
    "couch",
    "crab",
    "crocodile",
    "cup",
    "dinosaur",
    "dolphin",
    "elephant",
    "flatfish",
    "forest",
    "fox",
    "girl",
    "hamster",
    "house",
    "kangaroo",
    "keyboard",
    "lamp",
    "lawn_mower",
    "leopard",
    "lion",
    "lizard",
    "lobster",
    "man",
    "maple_tree",
    "motorcycle",
    "mountain",
    "mouse",
    "mushroom",
    "oak_tree",
    "orange",
    "orchid",
    "otter",
    "palm_tree",
    "pear",
    "pickup_truck",
    "pine_tree",
    "plain",
    "plate",
    "poppy",
    "porcupine",
    "possum",
    "rabbit",
    "raccoon",
    "ray",
    "road",
    "rocket",
    "rose",
    "sea",
    "seal",
    "shark",
    "shrew",
    "skunk",
    "skyscraper",
    "snail",
    "snake",
    "spider",
    "squirrel",
    "streetcar",
    "sunflower",
    "sweet_pepper",
    "table",
    "tank",
    "telephone",
    "television",
    "tiger",
    "tractor",
    "train",
    "trout",
    "tulip",
    "turtle",
    "wardrobe",
    "whale",
    "willow_tree",
    "wolf",
    "woman",
    "worm",
];
