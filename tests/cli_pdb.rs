use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const DONOR: &str = "\
ATOM      1  N   GLY A   1      -1.000   0.000   0.000  1.00  0.00           N
ATOM      2  CA  GLY A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      3  CA  SER A   2       3.800   0.000   0.000  1.00  0.00           C
ATOM      4  CA  TRP A   3       3.800   3.800   0.000  1.00  0.00           C
ATOM      5  CA  LYS A   4       3.800   3.800   3.800  1.00  0.00           C
END
";

const RECIPIENT: &str = "\
ATOM      1  CA  PRO A   1      10.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA  PRO A   2      10.000   3.800   0.000  1.00  0.00           C
ATOM      3  CA  ALA A   3       6.200   3.800   0.000  1.00  0.00           C
ATOM      4  CA  ALA A   4       6.200   3.800   3.800  1.00  0.00           C
ATOM      5  CA  GLU B   1       6.200   7.000   0.000  1.00  0.00           C
ATOM      6  CA  GLU B   2       6.200   7.000   3.800  1.00  0.00           C
ATOM      7  CA  ARG B   3       6.200   7.000   7.600  1.00  0.00           C
END
";

const PAIRS: &str = "\
cdr_resnames\tcdr_bp_id_str\tcdr_pdb_id\ttarget_length\ttarget_resnames\ttarget_bp_id_str\ttarget_pdb_id\tbinding_observed\tsimilarity_score\toriginal_cdr_resnames\toriginal_cdr_bp_id_str\toriginal_cdr_pdb_id
PPAA\t[0, 1, 2, 3]\t2rec\t3\tEER\t[4, 5, 6]\t2rec\t1\t\t\t\t
GSWK\t[0, 1, 2, 3]\t1don\t3\tEER\t[4, 5, 6]\t2rec\t0\t-12.0\tPPAA\t[0, 1, 2, 3]\t2rec
";

// (atom name, coordinates) of one chain
fn atoms(pdb: &str, chain: char) -> Vec<(String, [f64; 3])> {
    pdb.lines()
        .filter(|l| l.starts_with("ATOM") && l.chars().nth(21) == Some(chain))
        .map(|l| {
            (
                l[12..16].trim().to_string(),
                [
                    l[30..38].trim().parse().unwrap(),
                    l[38..46].trim().parse().unwrap(),
                    l[46..54].trim().parse().unwrap(),
                ],
            )
        })
        .collect()
}

fn setup() -> anyhow::Result<TempDir> {
    let temp = TempDir::new()?;
    let pdbs = temp.path().join("pdbs");
    fs::create_dir(&pdbs)?;
    fs::write(pdbs.join("1don.pdb"), DONOR)?;
    fs::write(pdbs.join("2rec.pdb"), RECIPIENT)?;
    fs::write(temp.path().join("pairs.tsv"), PAIRS)?;
    Ok(temp)
}

#[test]
fn command_pdb_writes_pairs() -> anyhow::Result<()> {
    let temp = setup()?;
    let outdir = temp.path().join("out");
    let list = temp.path().join("files.lst");

    let mut cmd = Command::cargo_bin("pepbind")?;
    cmd.arg("pdb")
        .arg(temp.path().join("pairs.tsv"))
        .arg("--pdb-dir")
        .arg(temp.path().join("pdbs"))
        .arg("--outdir")
        .arg(&outdir)
        .arg("--filenames-out")
        .arg(&list)
        .assert()
        .success();

    let names = fs::read_to_string(&list)?;
    let names: Vec<&str> = names.lines().collect();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("00000_pos_2rec_2rec.pdb"));
    assert!(names[1].ends_with("00001_neg_1don_2rec.pdb"));

    let positive = fs::read_to_string(outdir.join("00000_pos_2rec_2rec.pdb"))?;
    assert!(positive.contains("  CA  PRO C   1      10.000   0.000   0.000"));
    assert!(positive.contains("  CA  ARG T   3       6.200   7.000   7.600"));

    // The donated CDR's CA atoms land on the original CDR's
    let negative = fs::read_to_string(outdir.join("00001_neg_1don_2rec.pdb"))?;
    let cdr = atoms(&negative, 'C');
    let expected = [
        ("N", [10.0, -1.0, 0.0]),
        ("CA", [10.0, 0.0, 0.0]),
        ("CA", [10.0, 3.8, 0.0]),
        ("CA", [6.2, 3.8, 0.0]),
        ("CA", [6.2, 3.8, 3.8]),
    ];
    assert_eq!(cdr.len(), expected.len());
    for ((name, xyz), (e_name, e_xyz)) in cdr.iter().zip(expected.iter()) {
        assert_eq!(name, e_name);
        for k in 0..3 {
            assert!((xyz[k] - e_xyz[k]).abs() < 1e-3);
        }
    }
    assert_eq!(atoms(&negative, 'T').len(), 3);
    assert!(negative.contains("GLU T   1"));

    Ok(())
}

#[test]
fn command_pdb_missing_structure() -> anyhow::Result<()> {
    let temp = setup()?;
    fs::remove_file(temp.path().join("pdbs").join("1don.pdb"))?;

    let mut cmd = Command::cargo_bin("pepbind")?;
    cmd.arg("pdb")
        .arg(temp.path().join("pairs.tsv"))
        .arg("--pdb-dir")
        .arg(temp.path().join("pdbs"))
        .arg("--outdir")
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No structure file for 1don"));

    Ok(())
}
